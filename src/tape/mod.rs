//! Program tapes.
//!
//! Text format, one record per line, `;` starts a comment:
//! ```text
//! load 0          ; Pr 0
//! load 1
//! add             ; Ls1
//! store 2         ; Ps 2
//! print 2         ; Ld 2
//! repeat 4 3      ; run the 3 records above 4 times in total
//! halt
//! ```

pub mod instruction;
pub mod program;

pub use instruction::{Address, Instruction, Operands};
pub use program::{load_tape, ProgramTape, TapeError};

/// Random access to tape records, as the sequencer needs for rewinds.
pub trait TapeReader {
    /// The record at `position`, or `None` past the end of the tape.
    fn record(&self, position: usize) -> Option<Instruction>;

    /// Number of records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unchecked records, read as punched.
impl TapeReader for [Instruction] {
    fn record(&self, position: usize) -> Option<Instruction> {
        self.get(position).copied()
    }

    fn len(&self) -> usize {
        <[Instruction]>::len(self)
    }
}

impl TapeReader for Vec<Instruction> {
    fn record(&self, position: usize) -> Option<Instruction> {
        self.get(position).copied()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}
