//! Word layout parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::word::{Fields, FloatingWord};

/// Guard bits carried below the significand during arithmetic.
pub const GUARD_BITS: usize = 2;

/// Format errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("exponent width {0} outside 2..=10")]
    ExponentWidth(usize),

    #[error("fraction width {0} outside 2..=30")]
    FractionWidth(usize),

    #[error("word width {0} exceeds 32 bits")]
    WordWidth(usize),
}

/// Field widths of a floating word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatFormat {
    pub exponent_bits: usize,
    pub fraction_bits: usize,
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self::Z3
    }
}

impl FloatFormat {
    /// The Z3 layout: 1 + 7 + 14 = 22 bits.
    pub const Z3: FloatFormat = FloatFormat {
        exponent_bits: 7,
        fraction_bits: 14,
    };

    pub const fn new(exponent_bits: usize, fraction_bits: usize) -> Self {
        FloatFormat {
            exponent_bits,
            fraction_bits,
        }
    }

    /// Check that the layout is one the relay units can be built for.
    pub fn validate(&self) -> Result<(), FormatError> {
        if !(2..=10).contains(&self.exponent_bits) {
            return Err(FormatError::ExponentWidth(self.exponent_bits));
        }
        if !(2..=30).contains(&self.fraction_bits) {
            return Err(FormatError::FractionWidth(self.fraction_bits));
        }
        if self.width() > 32 {
            return Err(FormatError::WordWidth(self.width()));
        }
        Ok(())
    }

    /// Total word width.
    pub const fn width(&self) -> usize {
        1 + self.exponent_bits + self.fraction_bits
    }

    /// Significand width including the hidden bit.
    pub const fn significand_bits(&self) -> usize {
        self.fraction_bits + 1
    }

    /// Significand width plus guard bits.
    pub const fn working_bits(&self) -> usize {
        self.significand_bits() + GUARD_BITS
    }

    /// Width of the exponent registers inside the arithmetic units.
    ///
    /// Wide enough for the sum of two exponents plus normalization and
    /// rounding adjustments without wrapping.
    pub fn exponent_work_bits(&self) -> usize {
        let shifts = self.working_bits() + 2;
        let span = (usize::BITS - shifts.leading_zeros()) as usize;
        self.exponent_bits.max(span) + 2
    }

    /// The exponent code reserved for zero.
    pub const fn zero_code(&self) -> i32 {
        -(1 << (self.exponent_bits - 1))
    }

    /// Smallest exponent of a nonzero word.
    pub const fn min_exponent(&self) -> i32 {
        self.zero_code() + 1
    }

    /// Largest exponent.
    pub const fn max_exponent(&self) -> i32 {
        (1 << (self.exponent_bits - 1)) - 1
    }

    const fn fraction_mask(&self) -> u32 {
        (1 << self.fraction_bits) - 1
    }

    const fn exponent_mask(&self) -> u32 {
        (1 << self.exponent_bits) - 1
    }

    /// The canonical zero: sign 0, exponent code `10..0`, fraction 0.
    pub const fn zero(&self) -> FloatingWord {
        FloatingWord::from_bits(1 << (self.fraction_bits + self.exponent_bits - 1))
    }

    /// Assemble a word from its fields. Out-of-range parts are masked.
    pub const fn compose(&self, negative: bool, exponent: i32, fraction: u32) -> FloatingWord {
        let sign = (negative as u32) << (self.exponent_bits + self.fraction_bits);
        let exponent = ((exponent as u32) & self.exponent_mask()) << self.fraction_bits;
        FloatingWord::from_bits(sign | exponent | (fraction & self.fraction_mask()))
    }

    /// Split a word into its fields.
    pub fn fields(&self, word: FloatingWord) -> Fields {
        let bits = word.bits();
        let raw = (bits >> self.fraction_bits) & self.exponent_mask();
        let exponent = if raw >> (self.exponent_bits - 1) == 1 {
            raw as i32 - (1 << self.exponent_bits)
        } else {
            raw as i32
        };
        Fields {
            negative: (bits >> (self.exponent_bits + self.fraction_bits)) & 1 == 1,
            exponent,
            fraction: bits & self.fraction_mask(),
        }
    }

    /// Whether the word carries the zero exponent code.
    pub fn is_zero(&self, word: FloatingWord) -> bool {
        self.fields(word).exponent == self.zero_code()
    }

    /// Mask a word to the format width.
    pub const fn truncate(&self, word: FloatingWord) -> FloatingWord {
        let width = self.width();
        if width >= 32 {
            word
        } else {
            FloatingWord::from_bits(word.bits() & ((1 << width) - 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z3_layout() {
        let f = FloatFormat::Z3;
        assert_eq!(f.width(), 22);
        assert_eq!(f.zero_code(), -64);
        assert_eq!(f.min_exponent(), -63);
        assert_eq!(f.max_exponent(), 63);
        assert_eq!(f.zero().bits(), 1 << 20);
        assert_eq!(f.exponent_work_bits(), 9);
    }

    #[test]
    fn test_fields_round_trip() {
        let f = FloatFormat::Z3;
        let w = f.compose(true, -5, 0x1234);
        let fields = f.fields(w);
        assert!(fields.negative);
        assert_eq!(fields.exponent, -5);
        assert_eq!(fields.fraction, 0x1234);
        assert!(!f.is_zero(w));
        assert!(f.is_zero(f.zero()));
    }

    #[test]
    fn test_validate() {
        assert!(FloatFormat::Z3.validate().is_ok());
        assert_eq!(
            FloatFormat::new(1, 14).validate(),
            Err(FormatError::ExponentWidth(1))
        );
        assert_eq!(
            FloatFormat::new(7, 31).validate(),
            Err(FormatError::FractionWidth(31))
        );
        assert_eq!(
            FloatFormat::new(10, 30).validate(),
            Err(FormatError::WordWidth(41))
        );
    }
}
