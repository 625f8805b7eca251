//! The 64-word relay memory.
//!
//! Each word lives in its own [`LatchCell`]; an [`AddressSelector`] pyramid
//! decodes the address into one select line. A transfer only reaches the
//! cell whose line the selector energized.

pub mod cell;
pub mod selector;

use thiserror::Error;
use tracing::{event, Level};

use crate::float::{FloatFormat, FloatingWord};
use crate::relay::{BuildError, NetlistError, NetlistStats, PhaseClock};

pub use cell::LatchCell;
pub use selector::AddressSelector;

/// Number of memory words.
pub const CELL_COUNT: usize = 64;

/// Width of a memory address.
pub const ADDRESS_BITS: usize = 6;

/// Memory errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("address {0} is outside 0..64")]
    AddressOutOfRange(usize),

    #[error("selector energized no single line for address {0}")]
    Selector(usize),

    #[error(transparent)]
    Netlist(#[from] NetlistError),
}

/// Cells plus selector.
pub struct MemoryBank {
    cells: Vec<LatchCell>,
    selector: AddressSelector,
    format: FloatFormat,
}

impl MemoryBank {
    pub fn new(format: FloatFormat, iteration_cap: usize) -> Result<Self, BuildError> {
        let cells = (0..CELL_COUNT)
            .map(|i| LatchCell::build(&format!("cell{i}"), format.width(), iteration_cap))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MemoryBank {
            cells,
            selector: AddressSelector::build(iteration_cap)?,
            format,
        })
    }

    fn select(&mut self, address: usize) -> Result<usize, MemoryError> {
        if address >= CELL_COUNT {
            return Err(MemoryError::AddressOutOfRange(address));
        }
        let line = self.selector.select(address)?;
        self.selector.release()?;
        match line {
            Some(line) => Ok(line),
            None => Err(MemoryError::Selector(address)),
        }
    }

    /// Read a word. Non-destructive.
    pub fn read(&mut self, address: usize) -> Result<FloatingWord, MemoryError> {
        let line = self.select(address)?;
        let word = self.cells[line].read();
        event!(Level::TRACE, address, word = %word, "memory read");
        Ok(word)
    }

    /// Write a word. Only legal in phase B.
    pub fn write(
        &mut self,
        clock: &PhaseClock,
        address: usize,
        word: FloatingWord,
    ) -> Result<(), MemoryError> {
        let line = self.select(address)?;
        self.cells[line].write(clock, word)?;
        event!(Level::TRACE, address, word = %word, "memory write");
        Ok(())
    }

    /// Set every cell to the canonical zero. Only legal in phase B.
    pub fn clear(&mut self, clock: &PhaseClock) -> Result<(), MemoryError> {
        let zero = self.format.zero();
        for cell in &mut self.cells {
            cell.write(clock, zero)?;
        }
        Ok(())
    }

    /// Every stored word, in address order.
    pub fn snapshot(&self) -> Vec<FloatingWord> {
        self.cells.iter().map(LatchCell::read).collect()
    }

    pub fn stats(&self) -> NetlistStats {
        self.cells.iter().map(LatchCell::stats).sum::<NetlistStats>() + self.selector.stats()
    }
}
