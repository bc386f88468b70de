//! Records the signals a user has chosen to observe.
//!
//! A monitor is keyed by a `(device, output port)` pair and owns the ordered
//! sequence of [`Signal`] values recorded for it, one per simulated cycle.
//! Monitors are created and removed by `MONITOR` statements at parse time
//! and by the runtime command surface afterwards; their recorded sequences
//! are cleared whenever a fresh run starts.

use indexmap::IndexMap;
use itertools::Itertools;

use crate::device::{Devices, Signal};
use crate::errors::ErrorBus;
use crate::names::{ErrorCode, NameId, NameTable};
use crate::network::Network;

/// Error codes reserved by [`Monitors`].
pub struct MonitorCodes {
    pub not_output: ErrorCode,
    pub monitor_present: ErrorCode,
}

/// Tracks the monitored `(device, output port)` pairs and their records.
pub struct Monitors {
    records: IndexMap<(NameId, Option<NameId>), Vec<Signal>>,
    pub codes: MonitorCodes,
}

impl Monitors {
    pub fn new(names: &mut NameTable, errors: &mut ErrorBus) -> Self {
        let mut codes = names.reserve_error_codes(2);
        let mut next = || codes.next().expect("error code range exhausted");
        let codes = MonitorCodes {
            not_output: next(),
            monitor_present: next(),
        };
        errors.define_semantic_messages([
            (codes.not_output, "Only outputs can be monitored"),
            (codes.monitor_present, "This signal is already monitored"),
        ]);
        Self {
            records: IndexMap::new(),
            codes,
        }
    }

    /// Starts monitoring an output port.
    ///
    /// The device must exist and the port must name one of its outputs; a
    /// bare device name stands for the canonical output, so a multi-output
    /// device such as a D-type must be monitored with an explicit port.
    pub fn make_monitor(
        &mut self,
        devices: &Devices,
        network: &Network,
        device_id: NameId,
        port_id: Option<NameId>,
    ) -> Result<(), ErrorCode> {
        let device = devices
            .get_device(device_id)
            .ok_or(network.codes.device_absent)?;
        if !device.outputs.contains_key(&port_id) {
            return match port_id {
                Some(port) if device.inputs.contains_key(&port) => Err(self.codes.not_output),
                _ => Err(network.codes.port_absent),
            };
        }
        if self.records.contains_key(&(device_id, port_id)) {
            return Err(self.codes.monitor_present);
        }
        self.records.insert((device_id, port_id), Vec::new());
        Ok(())
    }

    /// Stops monitoring an output port. Returns `false` if it was not
    /// monitored.
    pub fn remove_monitor(&mut self, device_id: NameId, port_id: Option<NameId>) -> bool {
        self.records.shift_remove(&(device_id, port_id)).is_some()
    }

    /// Appends the current level of every monitored output to its record.
    pub fn record_signals(&mut self, devices: &Devices) {
        for (&(device_id, port_id), record) in self.records.iter_mut() {
            let level = devices
                .get_device(device_id)
                .and_then(|device| device.output(port_id))
                .unwrap_or(Signal::Blank);
            record.push(level);
        }
    }

    /// Clears every recorded sequence, keeping the monitors themselves.
    pub fn reset_monitors(&mut self) {
        for record in self.records.values_mut() {
            record.clear();
        }
    }

    /// The recorded sequences, keyed by `(device, output port)`.
    pub fn records(&self) -> &IndexMap<(NameId, Option<NameId>), Vec<Signal>> {
        &self.records
    }

    /// Signal names split into (monitored, unmonitored) output lists.
    pub fn get_signal_names(
        &self,
        devices: &Devices,
        names: &NameTable,
    ) -> (Vec<String>, Vec<String>) {
        let mut monitored = Vec::new();
        let mut unmonitored = Vec::new();
        for device in devices.iter() {
            for &port in device.outputs.keys() {
                if let Some(name) = devices.get_signal_name(names, device.id, port) {
                    if self.records.contains_key(&(device.id, port)) {
                        monitored.push(name);
                    } else {
                        unmonitored.push(name);
                    }
                }
            }
        }
        (monitored, unmonitored)
    }

    /// Renders every record as a text waveform, `-` for high and `_` for
    /// low, one named row per monitor.
    pub fn display_signals(&self, devices: &Devices, names: &NameTable) -> String {
        let width = self
            .records
            .keys()
            .filter_map(|&(device, port)| devices.get_signal_name(names, device, port))
            .map(|name| name.len())
            .max()
            .unwrap_or(0);
        self.records
            .iter()
            .map(|(&(device, port), record)| {
                let name = devices
                    .get_signal_name(names, device, port)
                    .unwrap_or_else(|| "?".to_string());
                let wave: String = record
                    .iter()
                    .map(|level| match level.steady() {
                        Signal::High => '-',
                        Signal::Low => '_',
                        _ => ' ',
                    })
                    .collect();
                format!("{:width$} {}", name, wave, width = width)
            })
            .join("\n")
    }
}
