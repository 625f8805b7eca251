//! Whole-machine runs.

use z3::arith::TrapCause;
use z3::machine::{Config, FaultKind, FaultPolicy, Machine, RunReport, RunStatus, ScriptedIo};
use z3::tape::{Address, Instruction, Operands, ProgramTape, TapeReader};

fn machine() -> Machine {
    Machine::new(Config::default()).unwrap()
}

fn run(machine: &mut Machine, source: &str, inputs: &[f64]) -> RunReport {
    let mut io = ScriptedIo::new(inputs.iter().copied());
    let report = machine.run_source(source, &mut io);
    assert_eq!(io.printed(), &report.outputs[..]);
    report
}

const SUM: &str = "\
load 0
load 1
add
store 2
print 2
halt
";

#[test]
fn sum_of_two_cells() {
    let mut m = machine();
    m.preload(0, 2.5).unwrap();
    m.preload(1, 1.25).unwrap();
    let report = run(&mut m, SUM, &[]);
    assert_eq!(report.status, RunStatus::HaltedNormally);
    assert_eq!(report.outputs, vec![3.75]);
    assert_eq!(report.value(2), Some(3.75));
    assert_eq!(report.value(0), Some(2.5));
    assert!(report.fault.is_none());
}

#[test]
fn division_by_zero_traps_without_output() {
    let mut m = machine();
    m.preload(0, 7.0).unwrap();
    let report = run(
        &mut m,
        "print 0\nload 0\nload 1\ndiv\nprint\nstore 2\nhalt",
        &[],
    );
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::ArithmeticTrap(TrapCause::ZeroDivisor))
    );
    // only the print before the division
    assert_eq!(report.outputs, vec![7.0]);
    let fault = report.fault.as_ref().unwrap();
    assert_eq!(fault.position, Some(3));
    assert_eq!(fault.unit.as_deref(), Some("div"));
    assert!(fault.cycle > 0);
    assert_eq!(report.value(2), Some(0.0));
}

#[test]
fn repeat_visits_range_in_order() {
    let mut m = machine();
    m.preload(0, 1.0).unwrap();
    m.preload(1, 0.5).unwrap();
    let source = "\
load 0      ; 0
add 1       ; 1  R1 := R1 + 0.5
store 0     ; 2
repeat 4 3  ; 3
print 0     ; 4
halt        ; 5
";
    let report = run(&mut m, source, &[]);
    assert_eq!(report.status, RunStatus::HaltedNormally);
    assert_eq!(report.outputs, vec![3.0]);

    let body: Vec<usize> = report.positions.iter().copied().filter(|p| *p < 3).collect();
    assert_eq!(body, [0, 1, 2].repeat(4));
    assert_eq!(report.positions.iter().filter(|p| **p == 3).count(), 4);
    assert_eq!(&report.positions[report.positions.len() - 2..], &[4, 5]);
}

#[test]
fn nested_repeats() {
    let mut m = machine();
    let source = "\
print       ; 0
print       ; 1
repeat 3 1  ; 2
repeat 2 3  ; 3
halt
";
    let report = run(&mut m, source, &[]);
    assert_eq!(report.status, RunStatus::HaltedNormally);
    // (1 + 3) prints per outer pass, two passes
    assert_eq!(report.outputs.len(), 8);
}

#[test]
fn runs_are_deterministic() {
    let source = "\
read 0
read 1
mul 0 1
sqrt
store 3
div 3 1
sub 0
print
repeat 3 3
print 3
halt
";
    let inputs = [3.0, 1.75];
    let first = run(&mut machine(), source, &inputs);
    let second = run(&mut machine(), source, &inputs);
    assert_eq!(first.status, RunStatus::HaltedNormally);
    assert_eq!(first, second);
}

#[test]
fn same_machine_runs_are_independent() {
    let source = "load 0\nload 1\nadd\nprint\nstore 2\nhalt";
    let mut m = machine();
    m.preload(0, 2.5).unwrap();
    m.preload(1, 1.25).unwrap();
    let first = run(&mut m, source, &[]);
    let second = run(&mut m, source, &[]);
    assert_eq!(first.outputs, vec![3.75]);
    assert_eq!(second.outputs, first.outputs);
    assert_eq!(second.positions, first.positions);
    assert_eq!(second.memory, first.memory);
    assert_eq!(second.cycles, first.cycles);
}

#[test]
fn run_after_operation_cut_short() {
    let config = Config {
        cycle_limit: 5,
        ..Config::default()
    };
    let mut m = Machine::new(config).unwrap();
    m.preload(0, 6.0).unwrap();
    m.preload(1, 3.0).unwrap();
    let report = run(&mut m, "div 0 1\nhalt", &[]);
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::CycleLimit)
    );

    let report = run(&mut m, "print\nhalt", &[]);
    assert_eq!(report.status, RunStatus::HaltedNormally);
    // the division left in flight does not reach R1
    assert_eq!(report.outputs, vec![0.0]);

    let report = run(&mut m, "div 0 1\nhalt", &[]);
    assert_ne!(report.status, RunStatus::HaltedOnFault(FaultKind::BusyUnit));
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::CycleLimit)
    );
}

#[test]
fn positions_do_not_depend_on_values() {
    let source = "\
load 0
load 1
sub
store 2
mul 2 2
print
repeat 2 3
halt
";
    let mut positions = Vec::new();
    for (a, b) in [(5.0, 3.0), (3.0, 5.0), (1.0, 1.0), (-2.5, 1e-3)] {
        let mut m = machine();
        m.preload(0, a).unwrap();
        m.preload(1, b).unwrap();
        let report = run(&mut m, source, &[]);
        assert_eq!(report.status, RunStatus::HaltedNormally);
        positions.push(report.positions);
    }
    assert!(positions.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn memory_round_trip() {
    let mut m = machine();
    let values: Vec<f64> = (0..64).map(|i| (i as f64 - 31.5) * 0.75).collect();
    for (address, value) in values.iter().enumerate() {
        m.preload(address, *value).unwrap();
    }
    for (address, value) in values.iter().enumerate() {
        assert_eq!(m.memory_value(address).unwrap(), *value);
    }
    let report = run(&mut m, "halt", &[]);
    assert_eq!(report.values(), values);
}

#[test]
fn unknown_opcode_is_ill_formed() {
    let mut m = machine();
    let report = run(&mut m, "load 0\njump 0\nhalt", &[]);
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::IllFormedProgram)
    );
    assert_eq!(report.cycles, 0);
    assert!(report.positions.is_empty());
}

#[test]
fn out_of_range_address() {
    let mut m = machine();
    // rejected when the tape is read
    let report = run(&mut m, "load 64\nhalt", &[]);
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::IllFormedProgram)
    );

    // unchecked records reach the memory bank and fault there
    let records = vec![
        Instruction::Print(None),
        Instruction::Store(Address::new(64)),
        Instruction::Halt,
    ];
    let report = m.run(&records, &mut ScriptedIo::default());
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::AddressOutOfRange)
    );
    let fault = report.fault.unwrap();
    assert_eq!(fault.kind, FaultKind::AddressOutOfRange);
    assert_eq!(fault.position, Some(1));
    assert_eq!(report.outputs, vec![0.0]);
    assert!(m.preload(64, 1.0).is_err());
}

#[test]
fn exponent_overflow() {
    let mut m = machine();
    m.preload(0, 2f64.powi(40)).unwrap();
    let report = run(&mut m, "mul 0 0\nprint\nhalt", &[]);
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::ArithmeticTrap(TrapCause::Overflow))
    );
    assert_eq!(report.fault.unwrap().position, Some(0));
    assert!(report.outputs.is_empty());
}

#[test]
fn collect_all_reports_every_error() {
    let config = Config {
        fault_policy: FaultPolicy::CollectAll,
        ..Config::default()
    };
    let mut m = Machine::new(config).unwrap();
    let report = run(&mut m, "jump\nload 99\nrepeat 0 1\n", &[]);
    let fault = report.fault.unwrap();
    assert_eq!(fault.kind, FaultKind::IllFormedProgram);
    assert!(fault.detail.contains("4 errors"), "{}", fault.detail);
}

/// A tape that runs out without `halt`.
struct Leader(Vec<Instruction>);

impl TapeReader for Leader {
    fn record(&self, position: usize) -> Option<Instruction> {
        self.0.get(position).copied()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[test]
fn tape_exhausted() {
    let mut m = machine();
    let tape = Leader(vec![Instruction::Print(None), Instruction::Print(None)]);
    let report = m.run(&tape, &mut ScriptedIo::default());
    assert_eq!(
        report.status,
        RunStatus::HaltedOnFault(FaultKind::TapeExhausted)
    );
    assert_eq!(report.outputs.len(), 2);
    assert_eq!(report.fault.unwrap().position, Some(2));
}

#[test]
fn injected_oscillation() {
    let config = Config {
        iteration_cap: 64,
        inject_oscillation: Some("mul".to_string()),
        ..Config::default()
    };
    let mut m = Machine::new(config).unwrap();
    // other units are unaffected
    let report = run(&mut m, "add\nprint\nhalt", &[]);
    assert!(report.status.is_normal());

    let report = run(&mut m, "mul\nprint\nhalt", &[]);
    assert_eq!(
        report.status,
        RunStatus::OscillationFault {
            netlist: "mul".to_string()
        }
    );
    assert!(report.outputs.is_empty());
}

#[test]
fn programmatic_tape() {
    let tape = ProgramTape::from_instructions(
        vec![
            Instruction::Read(None),
            Instruction::Mul(Operands::Registers),
            Instruction::Print(None),
            Instruction::Halt,
        ],
        FaultPolicy::FailFast,
    )
    .unwrap();
    let mut m = machine();
    let mut io = ScriptedIo::new([1.5]);
    let report = m.run(&tape, &mut io);
    // R2 is zero after reset, so the product is zero
    assert_eq!(report.outputs, vec![0.0]);
    assert_eq!(io.remaining(), 0);
}

#[test]
fn report_serializes() {
    let mut m = machine();
    m.preload(0, 2.5).unwrap();
    m.preload(1, 1.25).unwrap();
    let report = run(&mut m, SUM, &[]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "halted_normally");
    assert_eq!(json["outputs"][0], 3.75);
    assert_eq!(json["memory"].as_array().unwrap().len(), 64);
}
