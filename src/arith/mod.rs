//! The floating-point arithmetic unit.
//!
//! Five relay netlists, one per operation, each with the same port layout:
//! - inputs `x0..`, `y0..` (operand words) and `start`
//! - outputs `r0..` (result word), `done`, `busy`, and one flag per trap the
//!   operation can raise (`overflow`, `underflow`, `zero_divisor`,
//!   `negative_root`)
//!
//! Add and subtract share one template; subtract has the sign of `y` crossed
//! over in its wiring.

mod datapath;
mod addsub;
mod mul;
mod div;
mod sqrt;
pub mod unit;
pub mod registers;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::float::{FloatFormat, FloatingWord};
use crate::relay::{BuildError, NetlistError, NetlistStats, Phase, PhaseClock};

pub use registers::{RegisterPair, RegisterSelect};
pub use unit::{OperationUnit, UnitError};

/// An arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    SquareRoot,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::SquareRoot,
    ];

    /// Short name, also used as the netlist name.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "sub",
            Operation::Multiply => "mul",
            Operation::Divide => "div",
            Operation::SquareRoot => "sqrt",
        }
    }

    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Whether the operation reads only `x`.
    pub const fn is_unary(self) -> bool {
        matches!(self, Operation::SquareRoot)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an operation produced no word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapCause {
    Overflow,
    Underflow,
    ZeroDivisor,
    NegativeRoot,
}

impl TrapCause {
    /// Output port carrying the trap flag.
    pub const fn port(self) -> &'static str {
        match self {
            TrapCause::Overflow => "overflow",
            TrapCause::Underflow => "underflow",
            TrapCause::ZeroDivisor => "zero_divisor",
            TrapCause::NegativeRoot => "negative_root",
        }
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TrapCause::Overflow => "exponent overflow",
            TrapCause::Underflow => "exponent underflow",
            TrapCause::ZeroDivisor => "division by zero",
            TrapCause::NegativeRoot => "square root of a negative number",
        };
        f.write_str(text)
    }
}

/// The five operation units.
pub struct ArithmeticUnit {
    units: Vec<OperationUnit>,
}

impl ArithmeticUnit {
    /// Wire every unit. `inject` names a unit that gets a self-interrupting
    /// relay on its start line.
    pub fn new(
        format: FloatFormat,
        iteration_cap: usize,
        inject: Option<&str>,
    ) -> Result<Self, BuildError> {
        let units = Operation::ALL
            .into_iter()
            .map(|op| OperationUnit::build(op, format, iteration_cap, inject == Some(op.name())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArithmeticUnit { units })
    }

    pub fn unit(&self, op: Operation) -> &OperationUnit {
        &self.units[op.index()]
    }

    pub fn unit_mut(&mut self, op: Operation) -> &mut OperationUnit {
        &mut self.units[op.index()]
    }

    /// The first unit currently busy.
    pub fn busy(&self) -> Option<Operation> {
        self.units
            .iter()
            .find(|u| u.is_busy())
            .map(OperationUnit::operation)
    }

    /// Drop every raised `start` line.
    pub fn release(&mut self) {
        for unit in &mut self.units {
            unit.release();
        }
    }

    /// Longest cycle budget of any unit.
    pub fn cycle_budget(&self) -> usize {
        self.units
            .iter()
            .map(OperationUnit::cycle_budget)
            .max()
            .unwrap_or(0)
    }

    /// Strobe every unit's relays for `phase`.
    pub fn strobe(&mut self, clock: &PhaseClock, phase: Phase) -> Result<(), NetlistError> {
        for unit in &mut self.units {
            unit.strobe(clock, phase)?;
        }
        Ok(())
    }

    /// Run one operation to completion on a private clock.
    pub fn evaluate(
        &mut self,
        op: Operation,
        x: FloatingWord,
        y: FloatingWord,
    ) -> Result<Result<FloatingWord, TrapCause>, UnitError> {
        self.unit_mut(op).evaluate(x, y)
    }

    pub fn stats(&self) -> NetlistStats {
        self.units.iter().map(OperationUnit::stats).sum()
    }
}
