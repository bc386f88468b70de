//! # `logsim` — a compiler and simulator for digital logic circuits
//!
//! `logsim` compiles a text definition of a digital logic circuit — gates,
//! switches, clocks, D-type flip-flops, and reusable sub-circuits — into an
//! in-memory network, then event-drives that network for a requested number
//! of discrete cycles, recording signal traces for a chosen set of
//! monitored outputs.
//!
//! A definition file is a sequence of statements:
//!
//! ```text
//! # Two switch banks driving a pair of NAND gates.
//! SWITCH sw[1 TO 4] = 0;
//! NAND g[1 TO 2](IN = 2);
//! CONNECT sw1 -> g1.I1, sw2 -> g1.I2;
//! CONNECT sw3 -> g2.I1, sw4 -> g2.I2;
//! MONITOR g1, g2;
//! ```
//!
//! The compiler lexes, parses and semantically validates the file,
//! collecting every diagnostic rather than stopping at the first, and only
//! builds the network from statements that parsed cleanly.
//!
//! # Navigating the Crate
//!
//! ### [`simulator`] Module: Your Starting Point
//!
//! - **Overview**: A [`Simulator`] owns every shared component and exposes
//!   the whole command surface: load a definition, run or continue a
//!   simulation, edit switches, monitors and connections, and read traces.
//! - **Usage**: This is the API the bundled CLI drives; any other front end
//!   should go through it as well.
//!
//! ### [`names`], [`scanner`] and [`errors`] Modules: The Front End
//!
//! - [`NameTable`] interns identifier strings into the compact IDs every
//!   other component speaks in, and allocates the error-code space.
//! - [`Scanner`] turns the source text into [`Symbol`]s with line and
//!   column positions, skipping comments and whitespace.
//! - [`ErrorBus`] accumulates syntax and semantic diagnostics and renders
//!   them with a caret under the offending column.
//!
//! ### [`device`], [`network`] and [`monitor`] Modules: The Circuit
//!
//! - [`Devices`] makes and stores the primitive devices and the sub-circuit
//!   templates, enforcing per-kind qualifier rules.
//! - [`Network`] wires outputs to inputs, resolves sub-circuit endpoints,
//!   and advances the signal state cycle by cycle until stable.
//! - [`Monitors`] records the level of every observed output once per
//!   cycle.
//!
//! ### [`parser`] Module: The Middle
//!
//! - [`Parser`] drives the pipeline: it pulls symbols, recovers from
//!   errors at statement granularity, expands indexed-name loops and
//!   `CIRCUIT` blocks, and applies cleanly parsed statements to the
//!   circuit components.
//!
//! [`Simulator`]: simulator::Simulator
//! [`NameTable`]: names::NameTable
//! [`Scanner`]: scanner::Scanner
//! [`Symbol`]: scanner::Symbol
//! [`ErrorBus`]: errors::ErrorBus
//! [`Devices`]: device::Devices
//! [`Network`]: network::Network
//! [`Monitors`]: monitor::Monitors
//! [`Parser`]: parser::Parser

pub mod device;
pub mod errors;
pub mod monitor;
pub mod names;
pub mod network;
pub mod parser;
pub mod scanner;
pub mod simulator;

pub use device::*;
pub use errors::*;
pub use monitor::*;
pub use names::*;
pub use network::*;
pub use parser::*;
pub use scanner::*;
pub use simulator::*;
