//! Implements structs and methods for the devices of the logic network. See
//! [`Devices`] for the registry through which every device is made and
//! queried.
//!
//! ## Device
//! Every [`Device`] corresponds to one primitive element of the network: a
//! logic gate (`AND`, `OR`, `NAND`, `NOR`, `XOR`, `NOT`), a clock, a switch,
//! or a D-type flip-flop. A device owns its ports: a map from input-port ID
//! to the input's connection state, and a map from output-port ID to the
//! output's current [`Signal`]. Gates, switches and clocks drive a single
//! canonical output whose port ID is `None`; the D-type exposes the named
//! outputs `Q` and `QBAR` and the named inputs `CLK`, `SET`, `CLEAR` and
//! `DATA`.
//!
//! Per-kind working state (switch level, clock phase, D-type memory) lives
//! in the tagged [`DeviceState`] so that no device carries fields that are
//! meaningless for its kind.
//!
//! ## Sub-circuit templates
//! A [`CircuitTemplate`] is the parse-time description of a reusable
//! sub-circuit: which inner device inputs each circuit input fans out to,
//! and which inner device output each circuit output stands for. Templates
//! are resolved entirely at build time; the running network never contains a
//! circuit-level name.

use indexmap::IndexMap;
use rand::Rng;

use crate::errors::ErrorBus;
use crate::names::{ErrorCode, NameId, NameTable};

/// Largest permitted gate fan-in.
pub const MAX_GATE_INPUTS: u32 = 16;

/// A discrete signal level.
///
/// `Rising` and `Falling` are transient edge markers driven by clocks for
/// exactly one cycle; combinational gates read them as `High` and `Low`, and
/// only the D-type CLK input inspects them as edges. `Blank` stands for a
/// value that has not been computed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Signal {
    Low,
    High,
    Rising,
    Falling,
    Blank,
}

impl Signal {
    /// The steady level a combinational gate sees: edges collapse onto the
    /// level they are moving towards.
    pub fn steady(self) -> Signal {
        match self {
            Signal::Rising => Signal::High,
            Signal::Falling => Signal::Low,
            other => other,
        }
    }

    /// Logical inverse of a steady level; edges are collapsed first.
    pub fn inverted(self) -> Signal {
        match self.steady() {
            Signal::High => Signal::Low,
            Signal::Low => Signal::High,
            other => other,
        }
    }
}

/// The kind of a primitive device.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DeviceKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Not,
    Clock,
    Switch,
    Dtype,
}

/// Kind-specific working state of a device.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeviceState {
    /// Gates carry no state beyond their ports.
    Combinational,
    /// A clock holds its half period and the countdown to the next edge.
    Clock { half_period: u32, counter: u32 },
    /// A switch holds the level it drives.
    Switch { level: Signal },
    /// A D-type holds its latched memory.
    Dtype { memory: Signal },
}

/// A `(device, output-port)` reference; the port is `None` for the canonical
/// single output of gates, switches and clocks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SignalRef {
    pub device: NameId,
    pub port: Option<NameId>,
}

impl SignalRef {
    pub fn new(device: NameId, port: Option<NameId>) -> Self {
        Self { device, port }
    }
}

/// Connection state of one device input: where its signal comes from and the
/// level latched from that source, absent while unconnected.
#[derive(Clone, Copy, Default, Debug)]
pub struct InputPort {
    pub source: Option<SignalRef>,
    pub level: Option<Signal>,
}

/// One primitive device of the network.
pub struct Device {
    pub id: NameId,
    pub kind: DeviceKind,
    pub inputs: IndexMap<NameId, InputPort>,
    pub outputs: IndexMap<Option<NameId>, Signal>,
    pub state: DeviceState,
}

impl Device {
    fn new(id: NameId, kind: DeviceKind, state: DeviceState) -> Self {
        Self {
            id,
            kind,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            state,
        }
    }

    /// Current level of the given output port.
    pub fn output(&self, port: Option<NameId>) -> Option<Signal> {
        self.outputs.get(&port).copied()
    }
}

/// Parse-time template of a reusable sub-circuit.
pub struct CircuitTemplate {
    pub id: NameId,
    /// Circuit input port to the inner device inputs it fans out to.
    pub inputs: IndexMap<NameId, Vec<SignalRef>>,
    /// Circuit output port to the single inner device output it names.
    pub outputs: IndexMap<NameId, SignalRef>,
}

impl CircuitTemplate {
    fn new(id: NameId) -> Self {
        Self {
            id,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Adds one more inner target to a circuit input's fan-out.
    pub fn add_input(&mut self, port: NameId, target: SignalRef) {
        self.inputs.entry(port).or_default().push(target);
    }

    /// Binds a circuit output to an inner device output.
    pub fn set_output(&mut self, port: NameId, source: SignalRef) {
        self.outputs.insert(port, source);
    }
}

/// Error codes reserved by [`Devices`].
pub struct DeviceCodes {
    pub invalid_qualifier: ErrorCode,
    pub no_qualifier: ErrorCode,
    pub qualifier_present: ErrorCode,
    pub device_present: ErrorCode,
    pub circuit_present: ErrorCode,
}

/// Makes and stores every device and sub-circuit template of the network.
///
/// # Examples
///
/// ```
/// use logsim::device::{DeviceKind, Devices, Signal};
/// use logsim::errors::ErrorBus;
/// use logsim::names::NameTable;
///
/// let mut names = NameTable::new();
/// let mut errors = ErrorBus::new(&mut names);
/// let mut devices = Devices::new(&mut names, &mut errors);
///
/// let sw = names.intern("sw1");
/// devices.make_device(&mut names, sw, DeviceKind::Switch, Some(1)).unwrap();
/// assert_eq!(devices.get_device(sw).unwrap().output(None), Some(Signal::High));
///
/// // A clock must have a strictly positive half period.
/// let clk = names.intern("clk");
/// let err = devices.make_device(&mut names, clk, DeviceKind::Clock, Some(0));
/// assert_eq!(err, Err(devices.codes.invalid_qualifier));
/// ```
pub struct Devices {
    devices: IndexMap<NameId, Device>,
    circuits: IndexMap<NameId, CircuitTemplate>,
    pub codes: DeviceCodes,
    /// `CLK`, `SET`, `CLEAR`, `DATA`.
    pub dtype_input_ids: [NameId; 4],
    /// `Q`, `QBAR`.
    pub dtype_output_ids: [NameId; 2],
}

impl Devices {
    /// Initialises the registry, reserving its error codes and interning the
    /// fixed D-type port names.
    pub fn new(names: &mut NameTable, errors: &mut ErrorBus) -> Self {
        let mut codes = names.reserve_error_codes(5);
        let mut next = || codes.next().expect("error code range exhausted");
        let codes = DeviceCodes {
            invalid_qualifier: next(),
            no_qualifier: next(),
            qualifier_present: next(),
            device_present: next(),
            circuit_present: next(),
        };
        errors.define_semantic_messages([
            (
                codes.invalid_qualifier,
                "Device qualifier is out of range for this device kind",
            ),
            (codes.no_qualifier, "This device kind requires a qualifier"),
            (
                codes.qualifier_present,
                "This device kind does not take a qualifier",
            ),
            (
                codes.device_present,
                "Trying to define a device that already exists",
            ),
            (
                codes.circuit_present,
                "Circuit with this name is already defined",
            ),
        ]);
        let dtype_input_ids = [
            names.intern("CLK"),
            names.intern("SET"),
            names.intern("CLEAR"),
            names.intern("DATA"),
        ];
        let dtype_output_ids = [names.intern("Q"), names.intern("QBAR")];
        Self {
            devices: IndexMap::new(),
            circuits: IndexMap::new(),
            codes,
            dtype_input_ids,
            dtype_output_ids,
        }
    }

    /// Creates the specified device, validating its qualifier.
    ///
    /// The rules per kind:
    /// - `SWITCH` requires a qualifier of `0` or `1` (the initial level);
    /// - `CLOCK` requires a strictly positive half period;
    /// - `AND`/`OR`/`NAND`/`NOR` require a fan-in in `1..=16`;
    /// - `XOR` and `NOT` refuse a qualifier; their fan-in is fixed at 2 and 1;
    /// - `DTYPE` refuses a qualifier and gets the fixed D-type ports.
    pub fn make_device(
        &mut self,
        names: &mut NameTable,
        device_id: NameId,
        kind: DeviceKind,
        property: Option<u32>,
    ) -> Result<(), ErrorCode> {
        if self.devices.contains_key(&device_id) {
            return Err(self.codes.device_present);
        }
        match kind {
            DeviceKind::Switch => match property {
                None => Err(self.codes.no_qualifier),
                Some(0) => Ok(self.make_switch(device_id, Signal::Low)),
                Some(1) => Ok(self.make_switch(device_id, Signal::High)),
                Some(_) => Err(self.codes.invalid_qualifier),
            },
            DeviceKind::Clock => match property {
                None => Err(self.codes.no_qualifier),
                Some(0) => Err(self.codes.invalid_qualifier),
                Some(half_period) => Ok(self.make_clock(device_id, half_period)),
            },
            DeviceKind::And | DeviceKind::Or | DeviceKind::Nand | DeviceKind::Nor => {
                match property {
                    None => Err(self.codes.no_qualifier),
                    Some(n) if (1..=MAX_GATE_INPUTS).contains(&n) => {
                        Ok(self.make_gate(names, device_id, kind, n))
                    }
                    Some(_) => Err(self.codes.invalid_qualifier),
                }
            }
            DeviceKind::Xor => match property {
                None => Ok(self.make_gate(names, device_id, kind, 2)),
                Some(_) => Err(self.codes.qualifier_present),
            },
            DeviceKind::Not => match property {
                None => Ok(self.make_gate(names, device_id, kind, 1)),
                Some(_) => Err(self.codes.qualifier_present),
            },
            DeviceKind::Dtype => match property {
                None => Ok(self.make_dtype(device_id)),
                Some(_) => Err(self.codes.qualifier_present),
            },
        }
    }

    /// Makes a switch device driving its initial level.
    fn make_switch(&mut self, device_id: NameId, level: Signal) {
        let mut device = Device::new(device_id, DeviceKind::Switch, DeviceState::Switch { level });
        device.outputs.insert(None, level);
        self.devices.insert(device_id, device);
    }

    /// Makes a clock device with the specified half period, the number of
    /// cycles between output transitions.
    fn make_clock(&mut self, device_id: NameId, half_period: u32) {
        let mut device = Device::new(
            device_id,
            DeviceKind::Clock,
            DeviceState::Clock {
                half_period,
                counter: half_period - 1,
            },
        );
        device.outputs.insert(None, Signal::Low);
        self.devices.insert(device_id, device);
    }

    /// Makes a logic gate with inputs `I1..In` and the canonical output.
    fn make_gate(
        &mut self,
        names: &mut NameTable,
        device_id: NameId,
        kind: DeviceKind,
        fan_in: u32,
    ) {
        let mut device = Device::new(device_id, kind, DeviceState::Combinational);
        for pin in 1..=fan_in {
            let input_id = names.intern(&format!("I{}", pin));
            device.inputs.insert(input_id, InputPort::default());
        }
        device.outputs.insert(None, Signal::Low);
        self.devices.insert(device_id, device);
    }

    /// Makes a D-type flip-flop with its fixed ports.
    fn make_dtype(&mut self, device_id: NameId) {
        let mut device = Device::new(
            device_id,
            DeviceKind::Dtype,
            DeviceState::Dtype {
                memory: Signal::Low,
            },
        );
        for input_id in self.dtype_input_ids {
            device.inputs.insert(input_id, InputPort::default());
        }
        for output_id in self.dtype_output_ids {
            device.outputs.insert(Some(output_id), Signal::Low);
        }
        self.devices.insert(device_id, device);
    }

    /// Registers a sub-circuit template under the given name.
    pub fn make_circuit(&mut self, circuit_id: NameId) -> Result<(), ErrorCode> {
        if self.circuits.contains_key(&circuit_id) {
            return Err(self.codes.circuit_present);
        }
        self.circuits
            .insert(circuit_id, CircuitTemplate::new(circuit_id));
        Ok(())
    }

    pub fn has_circuit(&self, circuit_id: NameId) -> bool {
        self.circuits.contains_key(&circuit_id)
    }

    pub fn circuit(&self, circuit_id: NameId) -> Option<&CircuitTemplate> {
        self.circuits.get(&circuit_id)
    }

    pub fn circuit_mut(&mut self, circuit_id: NameId) -> Option<&mut CircuitTemplate> {
        self.circuits.get_mut(&circuit_id)
    }

    /// Resolves a reference through the circuit templates: a reference to a
    /// circuit output becomes the inner device output it stands for, while a
    /// reference to a primitive device passes through unchanged. `None` when
    /// the circuit has no such output port.
    pub fn resolve_output(&self, signal: SignalRef) -> Option<SignalRef> {
        match self.circuits.get(&signal.device) {
            Some(template) => signal
                .port
                .and_then(|port| template.outputs.get(&port))
                .copied(),
            None => Some(signal),
        }
    }

    /// Sets the level a switch drives. Returns `false` if the device does
    /// not exist or is not a switch.
    pub fn set_switch(&mut self, device_id: NameId, level: Signal) -> bool {
        match self.devices.get_mut(&device_id) {
            Some(device) => match &mut device.state {
                DeviceState::Switch { level: state } => {
                    *state = level;
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    pub fn get_device(&self, device_id: NameId) -> Option<&Device> {
        self.devices.get(&device_id)
    }

    pub fn get_device_mut(&mut self, device_id: NameId) -> Option<&mut Device> {
        self.devices.get_mut(&device_id)
    }

    /// IDs of every device of the specified kind, in creation order; all
    /// devices when no kind is given.
    pub fn find_devices(&self, kind: Option<DeviceKind>) -> Vec<NameId> {
        self.devices
            .values()
            .filter(|device| kind.map_or(true, |kind| device.kind == kind))
            .map(|device| device.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.values_mut()
    }

    /// The `device` or `device.port` string for a signal, or `None` if the
    /// device does not exist or the port is not one of its ports.
    pub fn get_signal_name(
        &self,
        names: &NameTable,
        device_id: NameId,
        port_id: Option<NameId>,
    ) -> Option<String> {
        let device = self.devices.get(&device_id)?;
        let device_name = names.stringify(device_id)?;
        match port_id {
            None => Some(device_name.to_string()),
            Some(port) => {
                if device.outputs.contains_key(&Some(port)) || device.inputs.contains_key(&port) {
                    Some(format!("{}.{}", device_name, names.stringify(port)?))
                } else {
                    None
                }
            }
        }
    }

    /// The device and port IDs named by a `device[.port]` string. Both parts
    /// are interned; existence is not checked here.
    pub fn get_signal_ids(&self, names: &mut NameTable, signal_name: &str) -> SignalRef {
        match signal_name.split_once('.') {
            Some((device, port)) => SignalRef::new(names.intern(device), Some(names.intern(port))),
            None => SignalRef::new(names.intern(signal_name), None),
        }
    }

    /// Simulates cold start-up of the clocks and D-types.
    ///
    /// Every D-type memory is randomised to `Low` or `High`; every clock is
    /// set to a random level and a random point in its cycle, so repeated
    /// runs explore different phase relationships.
    pub fn cold_startup(&mut self) {
        let mut rng = rand::thread_rng();
        for device in self.devices.values_mut() {
            match &mut device.state {
                DeviceState::Dtype { memory } => {
                    *memory = if rng.gen() { Signal::High } else { Signal::Low };
                }
                DeviceState::Clock {
                    half_period,
                    counter,
                } => {
                    *counter = rng.gen_range(0..*half_period);
                    let level = if rng.gen() { Signal::High } else { Signal::Low };
                    device.outputs.insert(None, level);
                }
                _ => {}
            }
        }
    }
}
