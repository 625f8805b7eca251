//! The whole machine: configuration, faults, I/O, and the tape sequencer.

pub mod config;
pub mod fault;
pub mod io;
pub mod report;
pub mod sequencer;

pub use config::{Config, ConfigError, FaultPolicy};
pub use fault::{Fault, FaultKind, RunStatus};
pub use io::{IoDevice, ScriptedIo};
pub use report::RunReport;
pub use sequencer::{Machine, MachineState};
