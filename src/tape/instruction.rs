//! Instruction records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arith::Operation;
use crate::memory::CELL_COUNT;

/// A memory operand as punched on the tape. Not checked against the memory
/// size until it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u16);

impl Address {
    pub const fn new(value: u16) -> Self {
        Address(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether a memory cell exists at this address.
    pub const fn is_valid(self) -> bool {
        (self.0 as usize) < CELL_COUNT
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operand addressing of a binary arithmetic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operands {
    /// Use R1 and R2 as loaded.
    Registers,
    /// R2 := [a], then operate on R1, R2.
    One(Address),
    /// R1 := [a], R2 := [b], then operate.
    Two(Address, Address),
}

impl Operands {
    fn addresses(self) -> impl Iterator<Item = Address> {
        let (a, b) = match self {
            Operands::Registers => (None, None),
            Operands::One(a) => (Some(a), None),
            Operands::Two(a, b) => (Some(a), Some(b)),
        };
        a.into_iter().chain(b)
    }
}

/// One tape record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    /// Memory to the next free register.
    Load(Address),
    /// R1 to memory; frees R1.
    Store(Address),
    Add(Operands),
    Sub(Operands),
    Mul(Operands),
    Div(Operands),
    /// Square root of R1, or of `[a]` loaded into R1.
    Sqrt(Option<Address>),
    /// Print R1, or `[a]`.
    Print(Option<Address>),
    /// Read a number into R1, or into `[a]`.
    Read(Option<Address>),
    Halt,
    /// Traverse the `span` records before this one `count` times in total.
    Repeat { count: u32, span: u32 },
}

impl Instruction {
    /// Canonical mnemonic.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Load(_) => "load",
            Instruction::Store(_) => "store",
            Instruction::Add(_) => "add",
            Instruction::Sub(_) => "sub",
            Instruction::Mul(_) => "mul",
            Instruction::Div(_) => "div",
            Instruction::Sqrt(_) => "sqrt",
            Instruction::Print(_) => "print",
            Instruction::Read(_) => "read",
            Instruction::Halt => "halt",
            Instruction::Repeat { .. } => "repeat",
        }
    }

    /// The arithmetic operation of this record, with its operand addressing.
    pub fn arithmetic(&self) -> Option<(Operation, Operands)> {
        match *self {
            Instruction::Add(ops) => Some((Operation::Add, ops)),
            Instruction::Sub(ops) => Some((Operation::Subtract, ops)),
            Instruction::Mul(ops) => Some((Operation::Multiply, ops)),
            Instruction::Div(ops) => Some((Operation::Divide, ops)),
            Instruction::Sqrt(None) => Some((Operation::SquareRoot, Operands::Registers)),
            Instruction::Sqrt(Some(a)) => Some((Operation::SquareRoot, Operands::One(a))),
            _ => None,
        }
    }

    /// Every memory address the record refers to.
    pub fn addresses(&self) -> Vec<Address> {
        match *self {
            Instruction::Load(a) | Instruction::Store(a) => vec![a],
            Instruction::Add(ops)
            | Instruction::Sub(ops)
            | Instruction::Mul(ops)
            | Instruction::Div(ops) => ops.addresses().collect(),
            Instruction::Sqrt(a) | Instruction::Print(a) | Instruction::Read(a) => {
                a.into_iter().collect()
            }
            Instruction::Halt | Instruction::Repeat { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        match *self {
            Instruction::Repeat { count, span } => write!(f, " {count} {span}"),
            _ => {
                for address in self.addresses() {
                    write!(f, " {address}")?;
                }
                Ok(())
            }
        }
    }
}

/// Opcode tokens, with the Z3 mnemonics as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Opcode {
    Load,
    Store,
    Add,
    Sub,
    Mul,
    Div,
    Sqrt,
    Print,
    Read,
    Halt,
    Repeat,
}

impl Opcode {
    pub(crate) fn from_token(token: &str) -> Option<Opcode> {
        let op = match token.to_ascii_lowercase().as_str() {
            "load" | "pr" => Opcode::Load,
            "store" | "ps" => Opcode::Store,
            "add" | "ls1" => Opcode::Add,
            "sub" | "ls2" => Opcode::Sub,
            "mul" | "lm" => Opcode::Mul,
            "div" | "li" => Opcode::Div,
            "sqrt" | "lw" => Opcode::Sqrt,
            "print" | "ld" => Opcode::Print,
            "read" | "lu" => Opcode::Read,
            "halt" => Opcode::Halt,
            "repeat" => Opcode::Repeat,
            _ => return None,
        };
        Some(op)
    }
}
