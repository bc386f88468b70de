//! Implements the [`Simulator`], the highest level of abstraction for
//! compiling and running a circuit. The simulator owns every shared
//! component — the name table, the error bus, the devices, the network and
//! the monitors — and is the single surface through which drivers (the CLI,
//! or a GUI shell) interact with a compiled circuit.
//!
//! Methods fall into three tiers:
//! 1. Compilation: [`Simulator::load`] parses a definition source, builds
//!    the network and accumulates diagnostics.
//! 2. Execution: [`Simulator::run`] starts a fresh randomised run,
//!    [`Simulator::continue_run`] extends it, and [`Simulator::traces`]
//!    hands back the recorded signals.
//! 3. Edits between runs: switch levels, monitors and connections can all
//!    be changed through the same method surface the parser uses.
//!
//! Component accessors come in shared/mutable pairs, `devices()` and
//! `devices_()`, for callers that need to reach a component directly.

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use thiserror::Error;

use crate::device::{Devices, Signal, SignalRef};
use crate::errors::ErrorBus;
use crate::monitor::Monitors;
use crate::names::{ErrorCode, NameTable};
use crate::network::Network;
use crate::parser::Parser;
use crate::scanner::Scanner;

/// A failure while cycling the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    /// The network failed to settle within the sweep bound.
    #[error("network failed to settle in cycle {cycle}: oscillation detected")]
    Oscillation { cycle: usize },
}

/// Owns a compiled circuit and drives its simulation.
///
/// # Examples
///
/// ```
/// use logsim::device::Signal;
/// use logsim::simulator::Simulator;
///
/// let mut sim = Simulator::new();
/// let ok = sim.load(
///     "SWITCH a = 1, b = 0;
///      NAND g(IN = 2);
///      CONNECT a -> g.I1, b -> g.I2;
///      MONITOR g;",
/// );
/// assert!(ok);
///
/// sim.run(3).unwrap();
/// assert_eq!(sim.traces()["g"], vec![Signal::High; 3]);
/// ```
pub struct Simulator {
    names: NameTable,
    errors: ErrorBus,
    devices: Devices,
    network: Network,
    monitors: Monitors,
    cycles_completed: usize,
}

impl Simulator {
    pub fn new() -> Self {
        let mut names = NameTable::new();
        let mut errors = ErrorBus::new(&mut names);
        let devices = Devices::new(&mut names, &mut errors);
        let network = Network::new(&mut names, &mut errors);
        let monitors = Monitors::new(&mut names, &mut errors);
        Self {
            names,
            errors,
            devices,
            network,
            monitors,
            cycles_completed: 0,
        }
    }

    /// Compiles a definition source, replacing any previously loaded
    /// circuit.
    ///
    /// Returns `true` when the source parsed without any diagnostic and the
    /// built network has no dangling inputs; otherwise the errors are
    /// available through [`Simulator::error_report`] and
    /// [`Simulator::unconnected_signals`], and the circuit must not be run.
    pub fn load(&mut self, source: &str) -> bool {
        *self = Simulator::new();
        let mut scanner = Scanner::new(source);
        let parsed = Parser::new(
            &mut self.names,
            &mut self.devices,
            &self.network,
            &mut self.monitors,
            &mut scanner,
            &mut self.errors,
        )
        .parse_network();
        parsed && self.network.unconnected_inputs(&self.devices).is_empty()
    }

    /// Starts a fresh run: randomises clock phases and D-type memories,
    /// clears the recorded traces and simulates `cycles` cycles.
    pub fn run(&mut self, cycles: usize) -> Result<(), SimulationError> {
        debug!("cold start, running {} cycles", cycles);
        self.devices.cold_startup();
        self.monitors.reset_monitors();
        self.cycles_completed = 0;
        self.continue_run(cycles)
    }

    /// Simulates `cycles` further cycles, carrying all state over.
    pub fn continue_run(&mut self, cycles: usize) -> Result<(), SimulationError> {
        for _ in 0..cycles {
            if !self.network.execute_network(&mut self.devices) {
                return Err(SimulationError::Oscillation {
                    cycle: self.cycles_completed + 1,
                });
            }
            self.monitors.record_signals(&self.devices);
            self.cycles_completed += 1;
        }
        Ok(())
    }

    /// Sets the level a named switch drives. Returns `false` for unknown
    /// names and non-switch devices.
    pub fn set_switch(&mut self, name: &str, level: Signal) -> bool {
        match self.names.query(name) {
            Some(id) => self.devices.set_switch(id, level),
            None => false,
        }
    }

    /// Starts monitoring the signal named by `device[.port]`.
    pub fn add_monitor(&mut self, signal_name: &str) -> Result<(), ErrorCode> {
        let target = self
            .parse_signal_name(signal_name)
            .ok_or(self.network.codes.device_absent)?;
        let target = self
            .devices
            .resolve_output(target)
            .ok_or(self.network.codes.port_absent)?;
        self.monitors
            .make_monitor(&self.devices, &self.network, target.device, target.port)
    }

    /// Stops monitoring the signal named by `device[.port]`.
    pub fn remove_monitor(&mut self, signal_name: &str) -> bool {
        match self.parse_signal_name(signal_name) {
            Some(target) => match self.devices.resolve_output(target) {
                Some(target) => self.monitors.remove_monitor(target.device, target.port),
                None => false,
            },
            None => false,
        }
    }

    /// Connects `src` to `dst`, both named as `device[.port]`.
    pub fn add_connection(&mut self, src: &str, dst: &str) -> Result<(), ErrorCode> {
        let src = self
            .parse_signal_name(src)
            .ok_or(self.network.codes.device_absent)?;
        let dst = self
            .parse_signal_name(dst)
            .ok_or(self.network.codes.device_absent)?;
        self.network.connect(&mut self.devices, src, dst)
    }

    /// Disconnects the input named by `device.port`.
    pub fn remove_connection(&mut self, dst: &str) -> bool {
        match self.parse_signal_name(dst) {
            Some(dst) => self.network.remove_connection(&mut self.devices, dst),
            None => false,
        }
    }

    /// The recorded trace of every monitor, keyed by signal name, in
    /// monitor-creation order.
    pub fn traces(&self) -> IndexMap<String, Vec<Signal>> {
        self.monitors
            .records()
            .iter()
            .map(|(&(device, port), record)| {
                let name = self
                    .devices
                    .get_signal_name(&self.names, device, port)
                    .unwrap_or_else(|| "?".to_string());
                (name, record.clone())
            })
            .collect()
    }

    /// Every recorded diagnostic, rendered for the user.
    pub fn error_report(&self) -> String {
        self.errors.display()
    }

    /// Names of the inputs left without a source by the loaded definition.
    pub fn unconnected_signals(&self) -> Vec<String> {
        self.network
            .unconnected_inputs(&self.devices)
            .into_iter()
            .filter_map(|(device, port)| {
                self.devices.get_signal_name(&self.names, device, Some(port))
            })
            .collect()
    }

    /// Validates a `device[.port]` string and interns its parts.
    fn parse_signal_name(&mut self, signal_name: &str) -> Option<SignalRef> {
        let form = Regex::new(r"^[A-Za-z][A-Za-z0-9]*(\.[A-Za-z][A-Za-z0-9]*)?$")
            .expect("signal name pattern is valid");
        if !form.is_match(signal_name) {
            return None;
        }
        Some(self.devices.get_signal_ids(&mut self.names, signal_name))
    }

    // Field accessors, shared and mutable.

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn names_(&mut self) -> &mut NameTable {
        &mut self.names
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn devices_(&mut self) -> &mut Devices {
        &mut self.devices
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn monitors(&self) -> &Monitors {
        &self.monitors
    }

    pub fn monitors_(&mut self) -> &mut Monitors {
        &mut self.monitors
    }

    pub fn errors(&self) -> &ErrorBus {
        &self.errors
    }

    /// Cycles simulated since the last fresh run.
    pub fn cycles_completed(&self) -> usize {
        self.cycles_completed
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
