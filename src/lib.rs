//! # Z3 Emulator
//!
//! A relay-level emulator of Konrad Zuse's Z3 (1941).
//!
//! Every part of the machine is a netlist of relays and contacts: the five
//! floating-point units, the 64-word memory with its selector pyramid, and
//! the R1/R2 registers. Netlists settle by fixed-point relaxation under a
//! two-phase clock, and a branch-free sequencer steps them through a
//! program tape.

pub mod relay;
pub mod circuit;
pub mod float;
pub mod arith;
pub mod memory;
pub mod tape;
pub mod machine;

// Re-export commonly used types
pub use relay::{Netlist, NetlistBuilder, NetlistError, Phase, PhaseClock, WiringDescription};
pub use float::{FloatFormat, FloatingWord};
pub use arith::{ArithmeticUnit, Operation, TrapCause};
pub use memory::MemoryBank;
pub use tape::{load_tape, Address, Instruction, Operands, ProgramTape, TapeError, TapeReader};
pub use machine::{
    Config, Fault, FaultKind, FaultPolicy, IoDevice, Machine, RunReport, RunStatus, ScriptedIo,
};
