//! Connects device ports and propagates signals through the network, one
//! simulation cycle at a time.
//!
//! ## Connections
//! A connection ties a device output to a device input. The sink input
//! stores a reference to its source and latches the source's current level;
//! an input has at most one source. [`Network::connect`] additionally
//! resolves endpoints that name a sub-circuit: a circuit output substitutes
//! the inner device output it stands for, and a circuit input fans the
//! connection out over every inner input it maps to, so that the built
//! network only ever references primitive devices.
//!
//! ## Execution
//! [`Network::execute_network`] advances the network by one cycle. Clocks
//! step first as one logical step: the previous cycle's edge markers settle
//! to their levels, and any clock whose countdown expires drives a fresh
//! `Rising` or `Falling` marker. Combinational devices are then swept
//! repeatedly, latching inputs from their sources and recomputing outputs,
//! until a full sweep changes nothing. A network that fails to settle
//! within [`SWEEP_LIMIT`] sweeps is reported as oscillating.

use std::collections::HashMap;

use log::debug;

use crate::device::{Device, DeviceKind, DeviceState, Devices, Signal, SignalRef};
use crate::errors::ErrorBus;
use crate::names::{ErrorCode, NameId, NameTable};

/// Most sweeps a single cycle may take before the network is declared
/// oscillating.
pub const SWEEP_LIMIT: usize = 20;

/// Error codes reserved by [`Network`].
pub struct NetworkCodes {
    pub input_to_input: ErrorCode,
    pub output_to_output: ErrorCode,
    pub input_connected: ErrorCode,
    pub port_absent: ErrorCode,
    pub device_absent: ErrorCode,
    pub not_input: ErrorCode,
    pub not_output: ErrorCode,
}

/// Wires device ports together and drives the per-cycle signal update.
pub struct Network {
    pub codes: NetworkCodes,
}

impl Network {
    pub fn new(names: &mut NameTable, errors: &mut ErrorBus) -> Self {
        let mut codes = names.reserve_error_codes(7);
        let mut next = || codes.next().expect("error code range exhausted");
        let codes = NetworkCodes {
            input_to_input: next(),
            output_to_output: next(),
            input_connected: next(),
            port_absent: next(),
            device_absent: next(),
            not_input: next(),
            not_output: next(),
        };
        errors.define_semantic_messages([
            (
                codes.input_to_input,
                "Cannot connect an input to another input",
            ),
            (
                codes.output_to_output,
                "Cannot connect an output to another output",
            ),
            (
                codes.input_connected,
                "This input is already connected to an output",
            ),
            (codes.port_absent, "This device has no port with this name"),
            (codes.device_absent, "No device with this name exists"),
            (codes.not_input, "The connection target is not an input"),
            (codes.not_output, "The connection source is not an output"),
        ]);
        Self { codes }
    }

    /// Connects `src` to `dst`, resolving sub-circuit endpoints first.
    ///
    /// A `src` naming a circuit output is replaced by the inner device
    /// output bound to it; a `dst` naming a circuit input is expanded into
    /// one underlying connection per inner input in its fan-out map.
    pub fn connect(
        &self,
        devices: &mut Devices,
        src: SignalRef,
        dst: SignalRef,
    ) -> Result<(), ErrorCode> {
        let src = devices.resolve_output(src).ok_or(self.codes.port_absent)?;
        if devices.has_circuit(dst.device) {
            let targets = dst
                .port
                .and_then(|port| devices.circuit(dst.device)?.inputs.get(&port).cloned())
                .ok_or(self.codes.port_absent)?;
            for target in targets {
                self.make_connection(devices, src, target)?;
            }
            Ok(())
        } else {
            self.make_connection(devices, src, dst)
        }
    }

    /// Connects the output `src` to the input `dst` on primitive devices.
    ///
    /// Checks that both devices and ports exist, that the source side is an
    /// output and the sink side an unconnected input, and then records the
    /// source on the sink and latches the source's current level.
    pub fn make_connection(
        &self,
        devices: &mut Devices,
        src: SignalRef,
        dst: SignalRef,
    ) -> Result<(), ErrorCode> {
        let src_device = devices
            .get_device(src.device)
            .ok_or(self.codes.device_absent)?;
        let src_is_output = src_device.outputs.contains_key(&src.port);
        let src_is_input = src
            .port
            .is_some_and(|port| src_device.inputs.contains_key(&port));
        let level = src_device.output(src.port);

        let dst_device = devices
            .get_device(dst.device)
            .ok_or(self.codes.device_absent)?;
        let dst_is_input = dst
            .port
            .is_some_and(|port| dst_device.inputs.contains_key(&port));
        let dst_is_output = dst_device.outputs.contains_key(&dst.port);

        if !src_is_output && !src_is_input {
            return Err(self.codes.port_absent);
        }
        if !dst_is_input && !dst_is_output {
            return Err(self.codes.port_absent);
        }
        if src_is_input && dst_is_input {
            return Err(self.codes.input_to_input);
        }
        if src_is_output && dst_is_output {
            return Err(self.codes.output_to_output);
        }
        if src_is_input {
            return Err(self.codes.not_output);
        }
        if dst_is_output {
            return Err(self.codes.not_input);
        }

        let dst_device = devices
            .get_device_mut(dst.device)
            .ok_or(self.codes.device_absent)?;
        let port = dst.port.ok_or(self.codes.port_absent)?;
        let input = dst_device
            .inputs
            .get_mut(&port)
            .ok_or(self.codes.port_absent)?;
        if input.source.is_some() {
            return Err(self.codes.input_connected);
        }
        input.source = Some(src);
        input.level = level;
        Ok(())
    }

    /// Records an inner target for a circuit input port, checking that the
    /// target names an existing device input.
    pub fn add_circuit_input(
        &self,
        devices: &mut Devices,
        circuit_id: NameId,
        port: NameId,
        target: SignalRef,
    ) -> Result<(), ErrorCode> {
        let device = devices
            .get_device(target.device)
            .ok_or(self.codes.device_absent)?;
        match target.port {
            Some(inner) if device.inputs.contains_key(&inner) => {}
            Some(inner) if device.outputs.contains_key(&Some(inner)) => {
                return Err(self.codes.not_input);
            }
            Some(_) => return Err(self.codes.port_absent),
            // A bare device name stands for its canonical output.
            None => return Err(self.codes.not_input),
        }
        if let Some(template) = devices.circuit_mut(circuit_id) {
            template.add_input(port, target);
        }
        Ok(())
    }

    /// Binds a circuit output port to an inner device output.
    pub fn add_circuit_output(
        &self,
        devices: &mut Devices,
        circuit_id: NameId,
        port: NameId,
        source: SignalRef,
    ) -> Result<(), ErrorCode> {
        let device = devices
            .get_device(source.device)
            .ok_or(self.codes.device_absent)?;
        if !device.outputs.contains_key(&source.port) {
            if source
                .port
                .is_some_and(|inner| device.inputs.contains_key(&inner))
            {
                return Err(self.codes.not_output);
            }
            return Err(self.codes.port_absent);
        }
        if let Some(template) = devices.circuit_mut(circuit_id) {
            template.set_output(port, source);
        }
        Ok(())
    }

    /// Disconnects the input `dst`. Returns `false` if the input does not
    /// exist or had no source.
    pub fn remove_connection(&self, devices: &mut Devices, dst: SignalRef) -> bool {
        let Some(port) = dst.port else { return false };
        let Some(device) = devices.get_device_mut(dst.device) else {
            return false;
        };
        match device.inputs.get_mut(&port) {
            Some(input) if input.source.is_some() => {
                input.source = None;
                input.level = None;
                true
            }
            _ => false,
        }
    }

    /// Every `(device, input port)` that has no source connected.
    pub fn unconnected_inputs(&self, devices: &Devices) -> Vec<(NameId, NameId)> {
        devices
            .iter()
            .flat_map(|device| {
                device
                    .inputs
                    .iter()
                    .filter(|(_, input)| input.source.is_none())
                    .map(move |(&port, _)| (device.id, port))
            })
            .collect()
    }

    /// Advances the network by one cycle. Returns `false` if the network
    /// failed to settle, through oscillation or an unconnected input.
    pub fn execute_network(&self, devices: &mut Devices) -> bool {
        let dtype_inputs = devices.dtype_input_ids;
        let dtype_outputs = devices.dtype_output_ids;
        self.step_clocks(devices);
        self.latch_inputs(devices);
        for sweep in 1..=SWEEP_LIMIT {
            let mut changed = false;
            let mut complete = true;
            for device in devices.iter_mut() {
                match Self::evaluate(device, dtype_inputs, dtype_outputs) {
                    Some(outputs) => {
                        for (port, level) in outputs {
                            if device.outputs.insert(port, level) != Some(level) {
                                changed = true;
                            }
                        }
                    }
                    None => complete = false,
                }
            }
            self.latch_inputs(devices);
            if !changed {
                debug!("network settled after {} sweep(s)", sweep);
                return complete;
            }
        }
        debug!("network failed to settle within {} sweeps", SWEEP_LIMIT);
        false
    }

    /// Settles the previous cycle's edges and drives fresh edges on clocks
    /// whose countdown expired.
    fn step_clocks(&self, devices: &mut Devices) {
        for device in devices.iter_mut() {
            let settled = device.output(None).unwrap_or(Signal::Low).steady();
            if let DeviceState::Clock {
                half_period,
                counter,
            } = &mut device.state
            {
                if *counter == 0 {
                    let edge = match settled {
                        Signal::High => Signal::Falling,
                        _ => Signal::Rising,
                    };
                    *counter = *half_period - 1;
                    device.outputs.insert(None, edge);
                } else {
                    *counter -= 1;
                    device.outputs.insert(None, settled);
                }
            }
        }
    }

    /// Copies every source output onto the inputs it drives.
    fn latch_inputs(&self, devices: &mut Devices) {
        let outputs: HashMap<SignalRef, Signal> = devices
            .iter()
            .flat_map(|device| {
                device
                    .outputs
                    .iter()
                    .map(move |(&port, &level)| (SignalRef::new(device.id, port), level))
            })
            .collect();
        for device in devices.iter_mut() {
            for input in device.inputs.values_mut() {
                if let Some(source) = input.source {
                    input.level = outputs.get(&source).copied();
                }
            }
        }
    }

    /// Computes a device's new outputs from its latched inputs, updating the
    /// D-type memory as a side effect. `None` when an input needed for the
    /// computation carries no level.
    fn evaluate(
        device: &mut Device,
        dtype_inputs: [NameId; 4],
        dtype_outputs: [NameId; 2],
    ) -> Option<Vec<(Option<NameId>, Signal)>> {
        match device.kind {
            // Clock outputs are managed by `step_clocks`.
            DeviceKind::Clock => Some(Vec::new()),
            DeviceKind::Switch => match device.state {
                DeviceState::Switch { level } => Some(vec![(None, level)]),
                _ => Some(Vec::new()),
            },
            DeviceKind::And | DeviceKind::Nand | DeviceKind::Or | DeviceKind::Nor => {
                let levels = Self::input_levels(device)?;
                let high = match device.kind {
                    DeviceKind::And | DeviceKind::Nand => {
                        levels.iter().all(|&level| level == Signal::High)
                    }
                    _ => levels.iter().any(|&level| level == Signal::High),
                };
                let inverted = matches!(device.kind, DeviceKind::Nand | DeviceKind::Nor);
                let level = if high != inverted {
                    Signal::High
                } else {
                    Signal::Low
                };
                Some(vec![(None, level)])
            }
            DeviceKind::Xor => {
                let levels = Self::input_levels(device)?;
                let highs = levels
                    .iter()
                    .filter(|&&level| level == Signal::High)
                    .count();
                let level = if highs % 2 == 1 {
                    Signal::High
                } else {
                    Signal::Low
                };
                Some(vec![(None, level)])
            }
            DeviceKind::Not => {
                let levels = Self::input_levels(device)?;
                Some(vec![(None, levels.first()?.inverted())])
            }
            DeviceKind::Dtype => Self::evaluate_dtype(device, dtype_inputs, dtype_outputs),
        }
    }

    /// Steady input levels in port order; `None` if any input is unlatched.
    fn input_levels(device: &Device) -> Option<Vec<Signal>> {
        device
            .inputs
            .values()
            .map(|input| input.level.map(Signal::steady))
            .collect()
    }

    /// D-type semantics: a rising CLK edge latches DATA; SET and CLEAR force
    /// the memory asynchronously, CLEAR winning on simultaneous assertion.
    /// `Q` follows the memory and `QBAR` its inverse.
    fn evaluate_dtype(
        device: &mut Device,
        [clk_id, set_id, clear_id, data_id]: [NameId; 4],
        [q_id, qbar_id]: [NameId; 2],
    ) -> Option<Vec<(Option<NameId>, Signal)>> {
        let clk = device.inputs.get(&clk_id)?.level?;
        let set = device.inputs.get(&set_id)?.level?;
        let clear = device.inputs.get(&clear_id)?.level?;
        let data = device.inputs.get(&data_id)?.level?;

        let DeviceState::Dtype { memory } = &mut device.state else {
            return Some(Vec::new());
        };
        if clk == Signal::Rising {
            *memory = data.steady();
        }
        if set.steady() == Signal::High {
            *memory = Signal::High;
        }
        if clear.steady() == Signal::High {
            *memory = Signal::Low;
        }
        let q = *memory;
        Some(vec![(Some(q_id), q), (Some(qbar_id), q.inverted())])
    }
}
