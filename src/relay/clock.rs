//! Two-phase machine clock.
//!
//! Each machine cycle runs phase A then phase B. Master relays of the
//! machine's registers latch in A, slaves in B, so no relay ever samples a
//! value that is changing in the same phase.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clock phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    A,
    B,
}

impl Phase {
    /// Both phases in cycle order.
    pub const ALL: [Phase; 2] = [Phase::A, Phase::B];

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
        }
    }
}

/// Clock sequencing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("cannot begin phase {requested:?} while {active:?} is active")]
    OutOfOrder {
        active: Option<Phase>,
        requested: Phase,
    },

    #[error("cannot finish a cycle while {active:?} is active")]
    Unfinished { active: Option<Phase> },
}

/// The phase clock shared by every netlist of one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseClock {
    cycle: u64,
    active: Option<Phase>,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a phase. A opens a new cycle, B must follow A.
    pub fn begin(&mut self, phase: Phase) -> Result<(), ClockError> {
        match (self.active, phase) {
            (None, Phase::A) => self.cycle += 1,
            (Some(Phase::A), Phase::B) => {}
            (active, requested) => return Err(ClockError::OutOfOrder { active, requested }),
        }
        self.active = Some(phase);
        Ok(())
    }

    /// Close the cycle after phase B.
    pub fn finish(&mut self) -> Result<(), ClockError> {
        if self.active != Some(Phase::B) {
            return Err(ClockError::Unfinished {
                active: self.active,
            });
        }
        self.active = None;
        Ok(())
    }

    /// Abandon the current cycle after a fault. The cycle count is kept.
    pub fn abort(&mut self) {
        self.active = None;
    }

    /// The phase currently active, if any.
    pub fn active(&self) -> Option<Phase> {
        self.active
    }

    /// Cycles begun so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
