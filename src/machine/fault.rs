//! Run faults and statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::arith::{TrapCause, UnitError};
use crate::float::ConvertError;
use crate::memory::MemoryError;
use crate::relay::{BuildError, ClockError, NetlistError};
use crate::tape::TapeError;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The tape was rejected before running.
    IllFormedProgram,
    /// A netlist did not settle within the iteration cap.
    Oscillation,
    /// An operation was issued to a unit still working on the last one.
    BusyUnit,
    /// A unit raised a trap instead of producing a word.
    ArithmeticTrap(TrapCause),
    AddressOutOfRange,
    /// A write or strobe outside its phase.
    PhaseViolation,
    /// The tape ran out before `halt`.
    TapeExhausted,
    /// `read` found no input.
    InputUnavailable,
    CycleLimit,
    /// A netlist could not be built or lacks a port.
    Wiring,
    Configuration,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::IllFormedProgram => f.write_str("ill-formed program"),
            FaultKind::Oscillation => f.write_str("oscillation"),
            FaultKind::BusyUnit => f.write_str("busy unit"),
            FaultKind::ArithmeticTrap(cause) => write!(f, "arithmetic trap ({cause})"),
            FaultKind::AddressOutOfRange => f.write_str("address out of range"),
            FaultKind::PhaseViolation => f.write_str("phase violation"),
            FaultKind::TapeExhausted => f.write_str("tape exhausted"),
            FaultKind::InputUnavailable => f.write_str("input unavailable"),
            FaultKind::CycleLimit => f.write_str("cycle limit"),
            FaultKind::Wiring => f.write_str("wiring"),
            FaultKind::Configuration => f.write_str("configuration"),
        }
    }
}

/// A fault with the context needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    /// Tape position of the record being executed.
    pub position: Option<usize>,
    /// Machine cycle, counted from the start of the run.
    pub cycle: u64,
    /// Netlist or unit involved.
    pub unit: Option<String>,
    pub detail: String,
}

impl Fault {
    pub fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Fault {
            kind,
            position: None,
            cycle: 0,
            unit: None,
            detail: detail.into(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attach the tape position and cycle, keeping any already set.
    pub fn locate(mut self, position: usize, cycle: u64) -> Self {
        self.position.get_or_insert(position);
        if self.cycle == 0 {
            self.cycle = cycle;
        }
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault", self.kind)?;
        if let Some(position) = self.position {
            write!(f, " at tape position {position}")?;
        }
        write!(f, ", cycle {}", self.cycle)?;
        if let Some(unit) = &self.unit {
            write!(f, ", unit {unit}")?;
        }
        write!(f, ": {}", self.detail)
    }
}

impl std::error::Error for Fault {}

impl From<NetlistError> for Fault {
    fn from(e: NetlistError) -> Self {
        let kind = match e {
            NetlistError::Oscillation { .. } => FaultKind::Oscillation,
            NetlistError::PhaseViolation { .. } => FaultKind::PhaseViolation,
            NetlistError::UnknownPort { .. } => FaultKind::Wiring,
        };
        let unit = e.netlist().to_string();
        Fault::new(kind, e.to_string()).with_unit(unit)
    }
}

impl From<BuildError> for Fault {
    fn from(e: BuildError) -> Self {
        match &e {
            BuildError::Unstable { netlist, .. } => {
                let unit = netlist.clone();
                Fault::new(FaultKind::Oscillation, e.to_string()).with_unit(unit)
            }
            _ => Fault::new(FaultKind::Wiring, e.to_string()),
        }
    }
}

impl From<ClockError> for Fault {
    fn from(e: ClockError) -> Self {
        Fault::new(FaultKind::PhaseViolation, e.to_string())
    }
}

impl From<MemoryError> for Fault {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::AddressOutOfRange(_) => {
                Fault::new(FaultKind::AddressOutOfRange, e.to_string()).with_unit("memory")
            }
            MemoryError::Selector(_) => {
                Fault::new(FaultKind::Wiring, e.to_string()).with_unit("selector")
            }
            MemoryError::Netlist(e) => e.into(),
        }
    }
}

impl From<UnitError> for Fault {
    fn from(e: UnitError) -> Self {
        match e {
            UnitError::Busy { ref unit } => {
                let unit = unit.clone();
                Fault::new(FaultKind::BusyUnit, e.to_string()).with_unit(unit)
            }
            UnitError::Stalled { ref unit, .. } => {
                let unit = unit.clone();
                Fault::new(FaultKind::CycleLimit, e.to_string()).with_unit(unit)
            }
            UnitError::Netlist(e) => e.into(),
            UnitError::Clock(e) => e.into(),
        }
    }
}

impl From<TapeError> for Fault {
    fn from(e: TapeError) -> Self {
        Fault::new(FaultKind::IllFormedProgram, e.to_string()).with_unit("tape")
    }
}

impl From<ConfigError> for Fault {
    fn from(e: ConfigError) -> Self {
        Fault::new(FaultKind::Configuration, e.to_string())
    }
}

impl From<ConvertError> for Fault {
    fn from(e: ConvertError) -> Self {
        let kind = match e {
            ConvertError::Overflow(_) => FaultKind::ArithmeticTrap(TrapCause::Overflow),
            ConvertError::Underflow(_) => FaultKind::ArithmeticTrap(TrapCause::Underflow),
            ConvertError::NotFinite(_) => FaultKind::InputUnavailable,
        };
        Fault::new(kind, e.to_string())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    HaltedNormally,
    HaltedOnFault(FaultKind),
    OscillationFault { netlist: String },
}

impl RunStatus {
    pub fn from_fault(fault: &Fault) -> Self {
        match fault.kind {
            FaultKind::Oscillation => RunStatus::OscillationFault {
                netlist: fault.unit.clone().unwrap_or_default(),
            },
            kind => RunStatus::HaltedOnFault(kind),
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, RunStatus::HaltedNormally)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::HaltedNormally => f.write_str("halted normally"),
            RunStatus::HaltedOnFault(kind) => write!(f, "halted on fault: {kind}"),
            RunStatus::OscillationFault { netlist } => {
                write!(f, "oscillation fault in netlist {netlist}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Phase;

    #[test]
    fn test_netlist_errors_keep_their_netlist() {
        let fault: Fault = NetlistError::Oscillation {
            netlist: "mul".to_string(),
            passes: 256,
        }
        .into();
        assert_eq!(fault.kind, FaultKind::Oscillation);
        assert_eq!(fault.unit.as_deref(), Some("mul"));
        assert_eq!(
            RunStatus::from_fault(&fault),
            RunStatus::OscillationFault {
                netlist: "mul".to_string()
            }
        );

        let fault: Fault = MemoryError::Netlist(NetlistError::PhaseViolation {
            netlist: "cell3".to_string(),
            requested: Phase::B,
            active: Some(Phase::A),
        })
        .into();
        assert_eq!(fault.kind, FaultKind::PhaseViolation);
    }

    #[test]
    fn test_locate_keeps_first_context() {
        let fault = Fault::new(FaultKind::TapeExhausted, "end of tape")
            .locate(4, 17)
            .locate(9, 30);
        assert_eq!(fault.position, Some(4));
        assert_eq!(fault.cycle, 17);
        assert_eq!(
            fault.to_string(),
            "tape exhausted fault at tape position 4, cycle 17: end of tape"
        );
    }

    #[test]
    fn test_trap_status() {
        let fault = Fault::new(FaultKind::ArithmeticTrap(TrapCause::ZeroDivisor), "x / 0");
        assert_eq!(
            RunStatus::from_fault(&fault),
            RunStatus::HaltedOnFault(FaultKind::ArithmeticTrap(TrapCause::ZeroDivisor))
        );
        assert!(RunStatus::HaltedNormally.is_normal());
    }
}
