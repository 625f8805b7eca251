//! The instruction sequencer and the machine it drives.
//!
//! One machine cycle:
//! 1. phase A: every arithmetic unit strobes its A relays
//! 2. phase B: the sequencer fetches or waits, doing its memory and register
//!    transfers, then every unit strobes its B relays
//!
//! The next position depends only on the current one and the repeat
//! counters. Nothing computed by the arithmetic unit reaches it.

use std::collections::BTreeMap;

use tracing::{event, Level};

use super::fault::{Fault, FaultKind, RunStatus};
use super::io::IoDevice;
use super::report::RunReport;
use super::Config;
use crate::arith::{ArithmeticUnit, Operation, RegisterPair, RegisterSelect, UnitError};
use crate::float::{FloatFormat, FloatingWord};
use crate::memory::MemoryBank;
use crate::relay::{NetlistStats, Phase, PhaseClock};
use crate::tape::{Instruction, Operands, ProgramTape, TapeReader};

/// Sequencer state between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,
    Halted,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubStep {
    Fetch,
    /// An operation is in flight since `since`.
    Await { op: Operation, since: u64 },
}

/// A Z3: memory, registers, arithmetic unit, and the tape sequencer.
pub struct Machine {
    config: Config,
    format: FloatFormat,
    memory: MemoryBank,
    registers: RegisterPair,
    alu: ArithmeticUnit,
    clock: PhaseClock,
    state: MachineState,
    position: usize,
    step: SubStep,
    /// Passes left, keyed by marker position.
    repeats: BTreeMap<usize, u32>,
    outputs: Vec<f64>,
    positions: Vec<usize>,
    run_start: u64,
}

impl Machine {
    /// Wire every netlist and clear memory and registers to zero.
    pub fn new(config: Config) -> Result<Self, Fault> {
        config.validate()?;
        let format = config.format;
        let cap = config.iteration_cap;
        let memory = MemoryBank::new(format, cap)?;
        let registers = RegisterPair::new(format, cap)?;
        let alu = ArithmeticUnit::new(format, cap, config.inject_oscillation.as_deref())?;

        let mut machine = Machine {
            config,
            format,
            memory,
            registers,
            alu,
            clock: PhaseClock::new(),
            state: MachineState::Running,
            position: 0,
            step: SubStep::Fetch,
            repeats: BTreeMap::new(),
            outputs: Vec::new(),
            positions: Vec::new(),
            run_start: 0,
        };
        machine.machine_cycle(|m| {
            m.memory.clear(&m.clock)?;
            m.registers.clear(&m.clock, m.format.zero())?;
            Ok(())
        })?;
        event!(
            Level::DEBUG,
            relays = machine.stats().relays,
            "machine wired"
        );
        Ok(machine)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn format(&self) -> FloatFormat {
        self.format
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Current tape position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Store a number in memory before a run. Takes one machine cycle.
    pub fn preload(&mut self, address: usize, value: f64) -> Result<(), Fault> {
        let word = self.format.encode(value)?;
        self.preload_word(address, word)
    }

    pub fn preload_word(&mut self, address: usize, word: FloatingWord) -> Result<(), Fault> {
        self.machine_cycle(|m| {
            m.memory.write(&m.clock, address, word)?;
            Ok(())
        })
    }

    /// Read a memory cell as a number.
    pub fn memory_value(&mut self, address: usize) -> Result<f64, Fault> {
        let word = self.memory.read(address)?;
        Ok(self.format.decode(word))
    }

    pub fn register(&self, reg: RegisterSelect) -> FloatingWord {
        self.registers.read(reg)
    }

    /// Run one operation on its unit, outside any tape.
    pub fn evaluate(&mut self, op: Operation, x: f64, y: f64) -> Result<f64, Fault> {
        let x = self.format.encode(x)?;
        let y = self.format.encode(y)?;
        match self.alu.evaluate(op, x, y)? {
            Ok(word) => Ok(self.format.decode(word)),
            Err(cause) => Err(Fault::new(
                FaultKind::ArithmeticTrap(cause),
                format!("{op} raised {cause}"),
            )
            .with_unit(op.name())),
        }
    }

    /// Parse tape text and run it. A rejected tape ends the run before its
    /// first cycle.
    pub fn run_source(&mut self, source: &str, io: &mut dyn IoDevice) -> RunReport {
        match ProgramTape::parse(source, self.config.fault_policy) {
            Ok(tape) => self.run(&tape, io),
            Err(e) => {
                let fault = Fault::from(e);
                event!(Level::WARN, fault = %fault, "tape rejected");
                self.reset_sequencer();
                self.report(Some(fault))
            }
        }
    }

    /// Run a tape from position 0 until `halt` or a fault. Memory keeps its
    /// contents from before the run; registers and units start idle.
    pub fn run<T: TapeReader + ?Sized>(&mut self, tape: &T, io: &mut dyn IoDevice) -> RunReport {
        self.reset_sequencer();
        if let Err(fault) = self.quiesce() {
            event!(Level::WARN, fault = %fault, "machine did not come to rest");
            self.state = MachineState::Faulted;
            return self.report(Some(fault));
        }
        self.run_start = self.clock.cycle();
        event!(Level::INFO, records = tape.len(), "run started");

        let fault = loop {
            if self.state == MachineState::Halted {
                break None;
            }
            if self.run_cycles() >= self.config.cycle_limit {
                let fault = Fault::new(
                    FaultKind::CycleLimit,
                    format!("no halt within {} cycles", self.config.cycle_limit),
                )
                .locate(self.position, self.run_cycles());
                break Some(fault);
            }
            if let Err(fault) = self.step(tape, io) {
                break Some(fault);
            }
        };

        match &fault {
            None => event!(
                Level::INFO,
                cycles = self.run_cycles(),
                outputs = self.outputs.len(),
                "halted"
            ),
            Some(fault) => event!(Level::WARN, fault = %fault, "run stopped on fault"),
        }
        self.report(fault)
    }

    /// Advance one machine cycle.
    pub fn step<T: TapeReader + ?Sized>(
        &mut self,
        tape: &T,
        io: &mut dyn IoDevice,
    ) -> Result<MachineState, Fault> {
        if self.state != MachineState::Running {
            return Ok(self.state);
        }
        let position = self.position;
        match self.machine_cycle(|m| m.sequence(tape, io)) {
            Ok(()) => Ok(self.state),
            Err(fault) => {
                self.state = MachineState::Faulted;
                Err(fault.locate(position, self.run_cycles()))
            }
        }
    }

    pub fn stats(&self) -> NetlistStats {
        self.memory.stats() + self.registers.stats() + self.alu.stats()
    }

    /// Relays in the whole machine.
    pub fn relay_count(&self) -> usize {
        self.stats().relays
    }

    fn run_cycles(&self) -> u64 {
        self.clock.cycle() - self.run_start
    }

    fn reset_sequencer(&mut self) {
        self.state = MachineState::Running;
        self.position = 0;
        self.step = SubStep::Fetch;
        self.repeats.clear();
        self.outputs.clear();
        self.positions.clear();
        self.run_start = self.clock.cycle();
    }

    /// Bring every unit to rest and clear R1 and R2. An operation left in
    /// flight by an earlier run is clocked out; its result is discarded.
    fn quiesce(&mut self) -> Result<(), Fault> {
        self.alu.release();
        let budget = self.alu.cycle_budget();
        let mut cycles = 0;
        while let Some(op) = self.alu.busy() {
            if cycles >= budget {
                return Err(UnitError::Stalled {
                    unit: op.name().to_string(),
                    cycles: budget,
                }
                .into());
            }
            self.machine_cycle(|_| Ok(()))?;
            cycles += 1;
        }
        self.machine_cycle(|m| {
            m.registers.clear(&m.clock, m.format.zero())?;
            Ok(())
        })
    }

    fn report(&self, fault: Option<Fault>) -> RunReport {
        RunReport {
            status: fault
                .as_ref()
                .map_or(RunStatus::HaltedNormally, RunStatus::from_fault),
            format: self.format,
            memory: self.memory.snapshot(),
            outputs: self.outputs.clone(),
            cycles: self.run_cycles(),
            positions: self.positions.clone(),
            fault,
        }
    }

    /// One A/B cycle with `action` in phase B, before the B strobe.
    fn machine_cycle<F>(&mut self, action: F) -> Result<(), Fault>
    where
        F: FnOnce(&mut Self) -> Result<(), Fault>,
    {
        let result = self.phases(action);
        if result.is_err() {
            self.clock.abort();
        }
        result
    }

    fn phases<F>(&mut self, action: F) -> Result<(), Fault>
    where
        F: FnOnce(&mut Self) -> Result<(), Fault>,
    {
        self.clock.begin(Phase::A)?;
        self.alu.strobe(&self.clock, Phase::A)?;
        self.clock.begin(Phase::B)?;
        action(self)?;
        self.alu.strobe(&self.clock, Phase::B)?;
        self.clock.finish()?;
        Ok(())
    }

    fn sequence<T: TapeReader + ?Sized>(
        &mut self,
        tape: &T,
        io: &mut dyn IoDevice,
    ) -> Result<(), Fault> {
        match self.step {
            SubStep::Fetch => self.fetch(tape, io),
            SubStep::Await { op, since } => self.await_unit(op, since),
        }
    }

    fn fetch<T: TapeReader + ?Sized>(
        &mut self,
        tape: &T,
        io: &mut dyn IoDevice,
    ) -> Result<(), Fault> {
        let position = self.position;
        let record = tape.record(position).ok_or_else(|| {
            Fault::new(
                FaultKind::TapeExhausted,
                format!("tape ends at position {} without halt", tape.len()),
            )
            .with_unit("tape")
        })?;
        self.positions.push(position);
        event!(
            Level::DEBUG,
            position,
            cycle = self.run_cycles(),
            record = %record,
            "fetch"
        );

        if let Some(address) = record.addresses().into_iter().find(|a| !a.is_valid()) {
            return Err(Fault::new(
                FaultKind::AddressOutOfRange,
                format!("`{record}` addresses cell {address}"),
            )
            .with_unit("memory"));
        }

        match record {
            Instruction::Load(a) => {
                let word = self.memory.read(a.index())?;
                self.registers.load(&self.clock, word)?;
                self.position += 1;
            }
            Instruction::Store(a) => {
                let word = self.registers.read(RegisterSelect::R1);
                self.memory.write(&self.clock, a.index(), word)?;
                self.registers.free_r1();
                self.position += 1;
            }
            Instruction::Add(_)
            | Instruction::Sub(_)
            | Instruction::Mul(_)
            | Instruction::Div(_)
            | Instruction::Sqrt(_) => {
                if let Some((op, operands)) = record.arithmetic() {
                    self.issue(op, operands)?;
                }
            }
            Instruction::Print(a) => {
                let word = match a {
                    Some(a) => self.memory.read(a.index())?,
                    None => self.registers.read(RegisterSelect::R1),
                };
                let value = self.format.decode(word);
                event!(Level::DEBUG, position, value, "print");
                io.print(value);
                self.outputs.push(value);
                self.position += 1;
            }
            Instruction::Read(a) => {
                let value = io.read().ok_or_else(|| {
                    Fault::new(FaultKind::InputUnavailable, "no input left to read")
                        .with_unit("io")
                })?;
                let word = self.format.encode(value)?;
                match a {
                    Some(a) => self.memory.write(&self.clock, a.index(), word)?,
                    None => self.registers.write(&self.clock, RegisterSelect::R1, word)?,
                }
                self.position += 1;
            }
            Instruction::Halt => {
                self.state = MachineState::Halted;
            }
            Instruction::Repeat { count, span } => self.repeat(count, span)?,
        }
        Ok(())
    }

    /// Transfer the operands and start the unit.
    fn issue(&mut self, op: Operation, operands: Operands) -> Result<(), Fault> {
        match operands {
            Operands::Registers => {}
            Operands::One(a) => {
                let word = self.memory.read(a.index())?;
                let target = if op.is_unary() {
                    RegisterSelect::R1
                } else {
                    RegisterSelect::R2
                };
                self.registers.write(&self.clock, target, word)?;
            }
            Operands::Two(a, b) => {
                let x = self.memory.read(a.index())?;
                let y = self.memory.read(b.index())?;
                self.registers.write(&self.clock, RegisterSelect::R1, x)?;
                self.registers.write(&self.clock, RegisterSelect::R2, y)?;
            }
        }
        let x = self.registers.read(RegisterSelect::R1);
        let y = self.registers.read(RegisterSelect::R2);
        self.alu.unit_mut(op).start(x, y)?;
        self.step = SubStep::Await {
            op,
            since: self.run_cycles(),
        };
        Ok(())
    }

    fn await_unit(&mut self, op: Operation, since: u64) -> Result<(), Fault> {
        let unit = self.alu.unit(op);
        let Some(outcome) = unit.outcome() else {
            let budget = unit.cycle_budget() as u64;
            if self.run_cycles() - since > budget {
                return Err(Fault::new(
                    FaultKind::CycleLimit,
                    format!("{op} did not finish within {budget} cycles"),
                )
                .with_unit(op.name()));
            }
            return Ok(());
        };
        match outcome {
            Ok(word) => {
                event!(
                    Level::DEBUG,
                    unit = op.name(),
                    cycles = self.run_cycles() - since,
                    result = %word,
                    "unit done"
                );
                self.registers.deposit(&self.clock, word, self.format.zero())?;
                self.step = SubStep::Fetch;
                self.position += 1;
                Ok(())
            }
            Err(cause) => Err(Fault::new(
                FaultKind::ArithmeticTrap(cause),
                format!("{op} raised {cause}"),
            )
            .with_unit(op.name())),
        }
    }

    /// Rewind over the range a marker closes while passes remain.
    fn repeat(&mut self, count: u32, span: u32) -> Result<(), Fault> {
        let marker = self.position;
        let remaining = self
            .repeats
            .entry(marker)
            .or_insert_with(|| count.saturating_sub(1));
        if *remaining == 0 {
            self.repeats.remove(&marker);
            self.position += 1;
            return Ok(());
        }
        *remaining -= 1;
        self.position = marker.checked_sub(span as usize).ok_or_else(|| {
            Fault::new(
                FaultKind::IllFormedProgram,
                format!("repeat span {span} reaches before the tape start"),
            )
            .with_unit("tape")
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ScriptedIo;
    use crate::tape::Address;

    fn machine() -> Machine {
        Machine::new(Config::default()).unwrap()
    }

    #[test]
    fn test_new_machine_is_zeroed() {
        let mut m = machine();
        let zero = m.format().zero();
        assert_eq!(m.register(RegisterSelect::R1), zero);
        assert_eq!(m.register(RegisterSelect::R2), zero);
        assert_eq!(m.memory_value(63).unwrap(), 0.0);
        assert!(m.relay_count() > 1000);
    }

    #[test]
    fn test_load_store_print() {
        let mut m = machine();
        m.preload(5, -0.75).unwrap();
        let mut io = ScriptedIo::default();
        let report = m.run_source("load 5\nstore 6\nprint 6\nhalt", &mut io);
        assert_eq!(report.status, RunStatus::HaltedNormally);
        assert_eq!(report.outputs, vec![-0.75]);
        assert_eq!(report.positions, vec![0, 1, 2, 3]);
        assert_eq!(report.cycles, 4);
        assert_eq!(m.memory_value(6).unwrap(), -0.75);
    }

    #[test]
    fn test_result_stays_in_r1() {
        let mut m = machine();
        m.preload(0, 3.0).unwrap();
        m.preload(1, 4.0).unwrap();
        let mut io = ScriptedIo::default();
        let report = m.run_source("mul 0 1\nload 0\nadd\nprint\nhalt", &mut io);
        assert_eq!(report.status, RunStatus::HaltedNormally);
        assert_eq!(report.outputs, vec![15.0]);
        assert_eq!(m.register(RegisterSelect::R2), m.format().zero());
    }

    #[test]
    fn test_read_into_memory() {
        let mut m = machine();
        let mut io = ScriptedIo::new([6.25]);
        let report = m.run_source("read 9\nsqrt 9\nstore 10\nhalt", &mut io);
        assert_eq!(report.status, RunStatus::HaltedNormally);
        assert_eq!(report.value(10), Some(2.5));
        assert_eq!(report.value(9), Some(6.25));
    }

    #[test]
    fn test_read_without_input() {
        let mut m = machine();
        let report = m.run_source("read\nhalt", &mut ScriptedIo::default());
        assert_eq!(
            report.status,
            RunStatus::HaltedOnFault(FaultKind::InputUnavailable)
        );
        assert_eq!(report.fault.unwrap().position, Some(0));
    }

    #[test]
    fn test_busy_unit_is_a_fault() {
        let mut m = machine();
        let one = m.format().encode(1.0).unwrap();
        m.alu.unit_mut(Operation::Add).start(one, one).unwrap();
        let tape = vec![Instruction::Add(Operands::Registers), Instruction::Halt];
        let fault = m.step(&tape, &mut ScriptedIo::default()).unwrap_err();
        assert_eq!(fault.kind, FaultKind::BusyUnit);
        assert_eq!(fault.unit.as_deref(), Some("add"));
        assert_eq!(fault.position, Some(0));
        assert_eq!(m.state(), MachineState::Faulted);

        // a new run releases the stray start line
        let report = m.run(&tape, &mut ScriptedIo::default());
        assert_eq!(report.status, RunStatus::HaltedNormally);
    }

    #[test]
    fn test_registers_reset_between_runs() {
        let mut m = machine();
        m.preload(0, 2.5).unwrap();
        let report = m.run_source("load 0
halt", &mut ScriptedIo::default());
        assert!(report.status.is_normal());
        assert_eq!(m.register(RegisterSelect::R1), m.format().encode(2.5).unwrap());

        let report = m.run_source("print
halt", &mut ScriptedIo::default());
        assert_eq!(report.outputs, vec![0.0]);
        assert_eq!(report.cycles, 2);
    }

    #[test]
    fn test_machine_recovers_after_fault() {
        let mut m = machine();
        let raw = vec![Instruction::Load(Address::new(64)), Instruction::Halt];
        let report = m.run(&raw, &mut ScriptedIo::default());
        assert_eq!(
            report.status,
            RunStatus::HaltedOnFault(FaultKind::AddressOutOfRange)
        );
        let report = m.run_source("print 0\nhalt", &mut ScriptedIo::default());
        assert!(report.status.is_normal());
        assert_eq!(report.outputs, vec![0.0]);
    }

    #[test]
    fn test_cycle_limit() {
        let config = Config {
            cycle_limit: 10,
            ..Config::default()
        };
        let mut m = Machine::new(config).unwrap();
        let report = m.run_source("print\nrepeat 50 1\nhalt", &mut ScriptedIo::default());
        assert_eq!(report.status, RunStatus::HaltedOnFault(FaultKind::CycleLimit));
        assert_eq!(report.cycles, 10);
    }

    #[test]
    fn test_evaluate() {
        let mut m = machine();
        assert_eq!(m.evaluate(Operation::Divide, 1.0, 4.0).unwrap(), 0.25);
        let fault = m.evaluate(Operation::SquareRoot, -4.0, 0.0).unwrap_err();
        assert_eq!(
            fault.kind,
            FaultKind::ArithmeticTrap(crate::arith::TrapCause::NegativeRoot)
        );
    }
}
