//! Raw floating words.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A floating word as a bit pattern. Interpreted through a
/// [`FloatFormat`](super::FloatFormat).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloatingWord(u32);

impl FloatingWord {
    pub const fn from_bits(bits: u32) -> Self {
        FloatingWord(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Bit `i`, least significant first.
    pub const fn bit(self, i: usize) -> bool {
        (self.0 >> i) & 1 == 1
    }
}

impl fmt::Debug for FloatingWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FloatingWord({:#x})", self.0)
    }
}

impl fmt::Display for FloatingWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

/// Decoded fields of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    pub negative: bool,
    /// Two's complement exponent; the format's zero code marks zero.
    pub exponent: i32,
    pub fraction: u32,
}
