//! Tape loading and validation.

use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;
use tracing::{event, Level};

use super::instruction::{Address, Instruction, Opcode, Operands};
use super::TapeReader;
use crate::machine::FaultPolicy;

/// A malformed tape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapeError {
    #[error("line {line}: unknown opcode `{opcode}`")]
    UnknownOpcode { line: usize, opcode: String },

    #[error("line {line}: bad address `{token}`")]
    BadAddress { line: usize, token: String },

    #[error("line {line}: `{opcode}` takes {expected} operands, found {found}")]
    OperandCount {
        line: usize,
        opcode: String,
        expected: &'static str,
        found: usize,
    },

    #[error("line {line}: bad repeat marker: {message}")]
    BadRepeat { line: usize, message: String },

    #[error("line {line}: repeat range crosses the range closed at line {other}")]
    CrossedRepeat { line: usize, other: usize },

    #[error("tape does not end with halt")]
    MissingHalt,

    #[error("{} errors:\n{}", .0.len(), list(.0))]
    Multiple(Vec<TapeError>),

    #[error("I/O error: {0}")]
    Io(String),
}

fn list(errors: &[TapeError]) -> String {
    let mut text = String::new();
    for e in errors {
        let _ = writeln!(text, "  {e}");
    }
    text
}

impl TapeError {
    /// Line of the first offending record, if there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            TapeError::UnknownOpcode { line, .. }
            | TapeError::BadAddress { line, .. }
            | TapeError::OperandCount { line, .. }
            | TapeError::BadRepeat { line, .. }
            | TapeError::CrossedRepeat { line, .. } => Some(*line),
            TapeError::Multiple(errors) => errors.iter().find_map(TapeError::line),
            TapeError::MissingHalt | TapeError::Io(_) => None,
        }
    }
}

/// A validated program: ends with `halt`, every address names a cell, and
/// repeat ranges are well formed and properly nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTape {
    records: Vec<Instruction>,
}

impl ProgramTape {
    /// Parse tape text.
    pub fn parse(source: &str, policy: FaultPolicy) -> Result<Self, TapeError> {
        let mut records = Vec::new();
        let mut lines = Vec::new();
        let mut errors = Vec::new();

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = match raw.find(';') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if text.is_empty() {
                continue;
            }
            match parse_record(text, line) {
                Ok(record) => {
                    records.push(record);
                    lines.push(line);
                }
                Err(e) if policy == FaultPolicy::FailFast => return Err(e),
                Err(e) => errors.push(e),
            }
        }

        errors.extend(check(&records, &lines));
        let tape = finish(records, errors, policy)?;
        event!(Level::DEBUG, records = tape.len(), "tape parsed");
        Ok(tape)
    }

    /// Validate records built in code. Line numbers in errors are record
    /// positions counted from 1.
    pub fn from_instructions(
        records: Vec<Instruction>,
        policy: FaultPolicy,
    ) -> Result<Self, TapeError> {
        let lines: Vec<usize> = (1..=records.len()).collect();
        let errors = check(&records, &lines);
        finish(records, errors, policy)
    }

    pub fn records(&self) -> &[Instruction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Canonical text; parses back to the same tape.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for record in &self.records {
            let _ = writeln!(text, "{record}");
        }
        text
    }
}

impl TapeReader for ProgramTape {
    fn record(&self, position: usize) -> Option<Instruction> {
        self.records.get(position).copied()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Read and parse a tape file.
pub fn load_tape(path: impl AsRef<Path>, policy: FaultPolicy) -> Result<ProgramTape, TapeError> {
    let source = std::fs::read_to_string(path).map_err(|e| TapeError::Io(e.to_string()))?;
    ProgramTape::parse(&source, policy)
}

fn finish(
    records: Vec<Instruction>,
    mut errors: Vec<TapeError>,
    policy: FaultPolicy,
) -> Result<ProgramTape, TapeError> {
    match errors.len() {
        0 => Ok(ProgramTape { records }),
        1 => Err(errors.remove(0)),
        _ if policy == FaultPolicy::FailFast => Err(errors.remove(0)),
        _ => Err(TapeError::Multiple(errors)),
    }
}

fn parse_record(text: &str, line: usize) -> Result<Instruction, TapeError> {
    let mut tokens = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    let Some(mnemonic) = tokens.next() else {
        return Err(TapeError::UnknownOpcode {
            line,
            opcode: String::new(),
        });
    };
    let operands: Vec<&str> = tokens.collect();
    let opcode = Opcode::from_token(mnemonic).ok_or_else(|| TapeError::UnknownOpcode {
        line,
        opcode: mnemonic.to_string(),
    })?;

    let count_error = |expected: &'static str| TapeError::OperandCount {
        line,
        opcode: mnemonic.to_string(),
        expected,
        found: operands.len(),
    };
    let address = |token: &str| parse_address(token, line);

    let record = match opcode {
        Opcode::Load | Opcode::Store => {
            let [a] = operands[..] else {
                return Err(count_error("1"));
            };
            let a = address(a)?;
            if opcode == Opcode::Load {
                Instruction::Load(a)
            } else {
                Instruction::Store(a)
            }
        }
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
            let ops = match operands[..] {
                [] => Operands::Registers,
                [a] => Operands::One(address(a)?),
                [a, b] => Operands::Two(address(a)?, address(b)?),
                _ => return Err(count_error("0 to 2")),
            };
            match opcode {
                Opcode::Add => Instruction::Add(ops),
                Opcode::Sub => Instruction::Sub(ops),
                Opcode::Mul => Instruction::Mul(ops),
                _ => Instruction::Div(ops),
            }
        }
        Opcode::Sqrt | Opcode::Print | Opcode::Read => {
            let a = match operands[..] {
                [] => None,
                [a] => Some(address(a)?),
                _ => return Err(count_error("0 or 1")),
            };
            match opcode {
                Opcode::Sqrt => Instruction::Sqrt(a),
                Opcode::Print => Instruction::Print(a),
                _ => Instruction::Read(a),
            }
        }
        Opcode::Halt => {
            if !operands.is_empty() {
                return Err(count_error("0"));
            }
            Instruction::Halt
        }
        Opcode::Repeat => {
            let [count, span] = operands[..] else {
                return Err(count_error("2"));
            };
            let number = |token: &str, what: &str| {
                token.parse::<u32>().map_err(|_| TapeError::BadRepeat {
                    line,
                    message: format!("{what} `{token}` is not a number"),
                })
            };
            Instruction::Repeat {
                count: number(count, "count")?,
                span: number(span, "span")?,
            }
        }
    };
    Ok(record)
}

fn parse_address(token: &str, line: usize) -> Result<Address, TapeError> {
    let bad = || TapeError::BadAddress {
        line,
        token: token.to_string(),
    };
    let address = Address::new(token.parse::<u16>().map_err(|_| bad())?);
    if !address.is_valid() {
        return Err(bad());
    }
    Ok(address)
}

/// Structural checks over decoded records.
fn check(records: &[Instruction], lines: &[usize]) -> Vec<TapeError> {
    let mut errors = Vec::new();
    // (first covered position, marker position) of every accepted range
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    for (position, record) in records.iter().enumerate() {
        let line = lines[position];
        for address in record.addresses() {
            if !address.is_valid() {
                errors.push(TapeError::BadAddress {
                    line,
                    token: address.to_string(),
                });
            }
        }
        let Instruction::Repeat { count, span } = *record else {
            continue;
        };
        let span = span as usize;
        if count == 0 {
            errors.push(TapeError::BadRepeat {
                line,
                message: "count must be at least 1".to_string(),
            });
            continue;
        }
        if span == 0 || span > position {
            errors.push(TapeError::BadRepeat {
                line,
                message: format!("span {span} does not fit the {position} records before it"),
            });
            continue;
        }
        let first = position - span;
        // a range must hold an earlier one entirely or not touch it
        if let Some(&(_, other)) = ranges
            .iter()
            .find(|&&(start, end)| first > start && first <= end)
        {
            errors.push(TapeError::CrossedRepeat {
                line,
                other: lines[other],
            });
            continue;
        }
        ranges.push((first, position));
    }

    if records.last() != Some(&Instruction::Halt) {
        errors.push(TapeError::MissingHalt);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<ProgramTape, TapeError> {
        ProgramTape::parse(source, FaultPolicy::FailFast)
    }

    #[test]
    fn test_parse_program() {
        let tape = parse(
            "; sum two cells\n\
             load 0\n\
             Pr 1          ; alias\n\
             add\n\
             store 2\n\
             print 2\n\
             halt\n",
        )
        .unwrap();
        assert_eq!(tape.len(), 6);
        assert_eq!(tape.records()[1], Instruction::Load(Address::new(1)));
        assert_eq!(tape.records()[2], Instruction::Add(Operands::Registers));
        assert_eq!(tape.record(4), Some(Instruction::Print(Some(Address::new(2)))));
        assert_eq!(tape.record(6), None);
    }

    #[test]
    fn test_operand_forms() {
        let tape = parse("mul 3, 4\nsub 5\nsqrt\nread 9\nrepeat 2 4\nhalt").unwrap();
        assert_eq!(
            tape.records()[0],
            Instruction::Mul(Operands::Two(Address::new(3), Address::new(4)))
        );
        assert_eq!(tape.records()[1], Instruction::Sub(Operands::One(Address::new(5))));
        assert_eq!(tape.records()[2], Instruction::Sqrt(None));
        assert_eq!(tape.records()[4], Instruction::Repeat { count: 2, span: 4 });
    }

    #[test]
    fn test_text_is_canonical() {
        let tape = parse("Pr 0\nLs1 1 2\nLd\nrepeat 3 2\nhalt").unwrap();
        let text = tape.to_text();
        assert_eq!(text, "load 0\nadd 1 2\nprint\nrepeat 3 2\nhalt\n");
        assert_eq!(parse(&text).unwrap(), tape);
    }

    #[test]
    fn test_unknown_opcode() {
        let err = parse("load 0\njump 3\nhalt").unwrap_err();
        assert_eq!(
            err,
            TapeError::UnknownOpcode {
                line: 2,
                opcode: "jump".to_string()
            }
        );
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_bad_addresses() {
        assert!(matches!(
            parse("load 64\nhalt"),
            Err(TapeError::BadAddress { line: 1, .. })
        ));
        assert!(matches!(
            parse("store -1\nhalt"),
            Err(TapeError::BadAddress { line: 1, .. })
        ));
        assert!(matches!(
            parse("load x\nhalt"),
            Err(TapeError::BadAddress { line: 1, .. })
        ));
    }

    #[test]
    fn test_operand_count() {
        assert!(matches!(
            parse("load\nhalt"),
            Err(TapeError::OperandCount { found: 0, .. })
        ));
        assert!(matches!(
            parse("halt 3"),
            Err(TapeError::OperandCount { found: 1, .. })
        ));
        assert!(matches!(
            parse("add 1 2 3\nhalt"),
            Err(TapeError::OperandCount { found: 3, .. })
        ));
    }

    #[test]
    fn test_missing_halt() {
        assert_eq!(parse("load 0\nprint"), Err(TapeError::MissingHalt));
        assert_eq!(parse(""), Err(TapeError::MissingHalt));
    }

    #[test]
    fn test_bad_repeats() {
        assert!(matches!(
            parse("load 0\nrepeat 0 1\nhalt"),
            Err(TapeError::BadRepeat { line: 2, .. })
        ));
        assert!(matches!(
            parse("load 0\nrepeat 2 2\nhalt"),
            Err(TapeError::BadRepeat { line: 2, .. })
        ));
        assert!(matches!(
            parse("repeat 2 zero\nhalt"),
            Err(TapeError::BadRepeat { line: 1, .. })
        ));
    }

    #[test]
    fn test_nested_and_crossed_repeats() {
        // inner range inside the outer one
        assert!(parse("load 0\nprint\nrepeat 2 1\nprint\nrepeat 3 4\nhalt").is_ok());
        // second range starts inside the first and ends after it
        let err = parse("print\nprint\nrepeat 2 2\nprint\nrepeat 2 2\nhalt").unwrap_err();
        assert_eq!(err, TapeError::CrossedRepeat { line: 5, other: 3 });
    }

    #[test]
    fn test_collect_all() {
        let err = ProgramTape::parse("jump\nload 99\nprint", FaultPolicy::CollectAll).unwrap_err();
        let TapeError::Multiple(errors) = err else {
            panic!("expected several errors");
        };
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], TapeError::UnknownOpcode { line: 1, .. }));
        assert!(matches!(errors[1], TapeError::BadAddress { line: 2, .. }));
        assert_eq!(errors[2], TapeError::MissingHalt);
    }

    #[test]
    fn test_from_instructions() {
        let records = vec![
            Instruction::Load(Address::new(70)),
            Instruction::Halt,
        ];
        assert!(matches!(
            ProgramTape::from_instructions(records, FaultPolicy::FailFast),
            Err(TapeError::BadAddress { line: 1, .. })
        ));
        let tape = ProgramTape::from_instructions(
            vec![Instruction::Print(None), Instruction::Halt],
            FaultPolicy::FailFast,
        )
        .unwrap();
        assert_eq!(tape.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_tape("/nonexistent/z3/tape.txt", FaultPolicy::FailFast).unwrap_err();
        assert!(matches!(err, TapeError::Io(_)));
    }
}
