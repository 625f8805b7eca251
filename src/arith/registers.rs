//! The floating registers R1 and R2 feeding the arithmetic unit.
//!
//! Both are latch cells of the memory template. The pair tracks which one
//! the next load goes to: R1 while it is free, R2 afterwards.

use serde::{Deserialize, Serialize};

use crate::float::{FloatFormat, FloatingWord};
use crate::memory::LatchCell;
use crate::relay::{BuildError, NetlistError, NetlistStats, PhaseClock};

/// One of the two registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterSelect {
    R1,
    R2,
}

pub struct RegisterPair {
    r1: LatchCell,
    r2: LatchCell,
    r1_loaded: bool,
}

impl RegisterPair {
    pub fn new(format: FloatFormat, iteration_cap: usize) -> Result<Self, BuildError> {
        Ok(RegisterPair {
            r1: LatchCell::build("R1", format.width(), iteration_cap)?,
            r2: LatchCell::build("R2", format.width(), iteration_cap)?,
            r1_loaded: false,
        })
    }

    fn cell_mut(&mut self, reg: RegisterSelect) -> &mut LatchCell {
        match reg {
            RegisterSelect::R1 => &mut self.r1,
            RegisterSelect::R2 => &mut self.r2,
        }
    }

    pub fn read(&self, reg: RegisterSelect) -> FloatingWord {
        match reg {
            RegisterSelect::R1 => self.r1.read(),
            RegisterSelect::R2 => self.r2.read(),
        }
    }

    /// Write a register directly. Only legal in phase B.
    pub fn write(
        &mut self,
        clock: &PhaseClock,
        reg: RegisterSelect,
        word: FloatingWord,
    ) -> Result<(), NetlistError> {
        self.cell_mut(reg).write(clock, word)?;
        if reg == RegisterSelect::R1 {
            self.r1_loaded = true;
        }
        Ok(())
    }

    /// Register the next load goes to.
    pub fn load_target(&self) -> RegisterSelect {
        if self.r1_loaded {
            RegisterSelect::R2
        } else {
            RegisterSelect::R1
        }
    }

    /// Load a word into the next free register. Returns the register used.
    pub fn load(
        &mut self,
        clock: &PhaseClock,
        word: FloatingWord,
    ) -> Result<RegisterSelect, NetlistError> {
        let target = self.load_target();
        self.write(clock, target, word)?;
        Ok(target)
    }

    /// Mark R1 free; the next load refills it.
    pub fn free_r1(&mut self) {
        self.r1_loaded = false;
    }

    /// Leave `result` in R1 and clear R2.
    pub fn deposit(
        &mut self,
        clock: &PhaseClock,
        result: FloatingWord,
        zero: FloatingWord,
    ) -> Result<(), NetlistError> {
        self.write(clock, RegisterSelect::R1, result)?;
        self.write(clock, RegisterSelect::R2, zero)
    }

    /// Reset both registers to zero and free R1.
    pub fn clear(&mut self, clock: &PhaseClock, zero: FloatingWord) -> Result<(), NetlistError> {
        self.write(clock, RegisterSelect::R1, zero)?;
        self.write(clock, RegisterSelect::R2, zero)?;
        self.r1_loaded = false;
        Ok(())
    }

    pub fn stats(&self) -> NetlistStats {
        self.r1.stats() + self.r2.stats()
    }
}
