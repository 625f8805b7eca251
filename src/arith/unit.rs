//! One operation unit: its netlist and the port-level protocol around it.
//!
//! Protocol, one machine cycle per step:
//! 1. with the unit idle, drive both operands and raise `start`
//! 2. the next phase A latches the first step; `start` is dropped once the
//!    unit reports busy
//! 3. keep clocking until `done` is set and `busy` clear, then read the
//!    result word or the trap flag

use thiserror::Error;
use tracing::{event, Level};

use super::datapath::{buzzer, complete, operand};
use super::{addsub, div, mul, sqrt, Operation, TrapCause};
use crate::circuit::Circuit;
use crate::float::{FloatFormat, FloatingWord};
use crate::relay::{
    BuildError, ClockError, InputId, Netlist, NetlistError, NetlistStats, NodeId, Phase,
    PhaseClock,
};

/// Errors driving a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unit {unit} started while busy")]
    Busy { unit: String },

    #[error("unit {unit} did not finish within {cycles} cycles")]
    Stalled { unit: String, cycles: usize },

    #[error(transparent)]
    Netlist(#[from] NetlistError),

    #[error(transparent)]
    Clock(#[from] ClockError),
}

/// A wired operation unit.
pub struct OperationUnit {
    operation: Operation,
    format: FloatFormat,
    netlist: Netlist,
    x: Vec<InputId>,
    y: Vec<InputId>,
    start: InputId,
    result: Vec<NodeId>,
    done: NodeId,
    busy: NodeId,
    traps: Vec<(TrapCause, NodeId)>,
}

impl OperationUnit {
    /// Wire the netlist for `operation`.
    pub fn build(
        operation: Operation,
        format: FloatFormat,
        iteration_cap: usize,
        inject_oscillation: bool,
    ) -> Result<Self, BuildError> {
        let mut c = Circuit::new(operation.name());
        let x = operand(&mut c, "x", &format);
        let y = operand(&mut c, "y", &format);
        let start = c.input("start");

        let datapath = match operation {
            Operation::Add => addsub::wire(&mut c, &format, &x, &y, start, false),
            Operation::Subtract => addsub::wire(&mut c, &format, &x, &y, start, true),
            Operation::Multiply => mul::wire(&mut c, &format, &x, &y, start),
            Operation::Divide => div::wire(&mut c, &format, &x, &y, start),
            Operation::SquareRoot => sqrt::wire(&mut c, &format, &x, start),
        };
        complete(&mut c, start, &datapath);
        if inject_oscillation {
            buzzer(&mut c, start);
        }

        let netlist = c.finish(iteration_cap)?;
        let port = |e: NetlistError| BuildError::UnknownName {
            netlist: operation.name().to_string(),
            kind: "port",
            name: e.to_string(),
        };
        let width = format.width();
        let traps = datapath
            .traps
            .iter()
            .map(|(cause, _)| netlist.output(cause.port()).map(|node| (*cause, node)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(port)?;

        let unit = OperationUnit {
            operation,
            format,
            x: netlist.input_bank("x", width).map_err(port)?,
            y: netlist.input_bank("y", width).map_err(port)?,
            start: netlist.input("start").map_err(port)?,
            result: netlist.output_bank("r", width).map_err(port)?,
            done: netlist.output("done").map_err(port)?,
            busy: netlist.output("busy").map_err(port)?,
            traps,
            netlist,
        };
        event!(
            Level::DEBUG,
            unit = operation.name(),
            relays = unit.netlist.stats().relays,
            "unit wired"
        );
        Ok(unit)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    pub fn stats(&self) -> NetlistStats {
        self.netlist.stats()
    }

    /// Whether an operation is in flight (or has been started and not yet
    /// latched).
    pub fn is_busy(&self) -> bool {
        self.netlist.is_driven(self.start) || self.netlist.read(self.busy)
    }

    /// Drive the operands and raise `start`.
    pub fn start(&mut self, x: FloatingWord, y: FloatingWord) -> Result<(), UnitError> {
        if self.is_busy() {
            return Err(UnitError::Busy {
                unit: self.name().to_string(),
            });
        }
        self.netlist.drive_word(&self.x, x.bits());
        self.netlist.drive_word(&self.y, y.bits());
        self.netlist.drive(self.start, true);
        event!(Level::TRACE, unit = self.name(), x = %x, y = %y, "unit started");
        Ok(())
    }

    /// Drop `start` if no step has latched it yet. A latched operation runs
    /// on to `done` regardless.
    pub fn release(&mut self) {
        self.netlist.drive(self.start, false);
    }

    /// Strobe the unit's relays for `phase`.
    pub fn strobe(&mut self, clock: &PhaseClock, phase: Phase) -> Result<(), NetlistError> {
        self.netlist.strobe(clock, phase)?;
        if phase == Phase::B && self.netlist.is_driven(self.start) && self.netlist.read(self.busy)
        {
            self.netlist.drive(self.start, false);
        }
        Ok(())
    }

    /// The result of the last operation, once it has finished.
    pub fn outcome(&self) -> Option<Result<FloatingWord, TrapCause>> {
        if self.is_busy() || !self.netlist.read(self.done) {
            return None;
        }
        if let Some((cause, _)) = self.traps.iter().find(|(_, node)| self.netlist.read(*node)) {
            return Some(Err(*cause));
        }
        let word = FloatingWord::from_bits(self.netlist.read_word(&self.result));
        Some(Ok(self.format.truncate(word)))
    }

    /// Cycles an operation needs from `start` to `done`, with margin.
    pub fn cycle_budget(&self) -> usize {
        2 * self.format.working_bits() + 8
    }

    /// Start an operation and clock it to completion on a private clock.
    pub fn evaluate(
        &mut self,
        x: FloatingWord,
        y: FloatingWord,
    ) -> Result<Result<FloatingWord, TrapCause>, UnitError> {
        self.start(x, y)?;
        let mut clock = PhaseClock::new();
        let budget = self.cycle_budget();
        for _ in 0..budget {
            clock.begin(Phase::A)?;
            self.strobe(&clock, Phase::A)?;
            clock.begin(Phase::B)?;
            self.strobe(&clock, Phase::B)?;
            clock.finish()?;
            if let Some(outcome) = self.outcome() {
                return Ok(outcome);
            }
        }
        Err(UnitError::Stalled {
            unit: self.name().to_string(),
            cycles: budget,
        })
    }
}
