//! Conversion between floating words and `f64` at the I/O boundary.

use thiserror::Error;

use super::format::FloatFormat;
use super::word::FloatingWord;

/// Errors converting a native number into a word.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConvertError {
    #[error("{0} is not a finite number")]
    NotFinite(f64),

    #[error("{0} is too large for the word format")]
    Overflow(f64),

    #[error("{0} is too small for the word format")]
    Underflow(f64),
}

const F64_FRACTION_BITS: u32 = 52;

impl FloatFormat {
    /// Round a native number to the nearest word, ties away from zero.
    pub fn encode(&self, value: f64) -> Result<FloatingWord, ConvertError> {
        if !value.is_finite() {
            return Err(ConvertError::NotFinite(value));
        }
        if value == 0.0 {
            return Ok(self.zero());
        }

        let bits = value.to_bits();
        let negative = bits >> 63 == 1;
        let biased = ((bits >> F64_FRACTION_BITS) & 0x7ff) as i32;
        let stored = bits & ((1u64 << F64_FRACTION_BITS) - 1);
        let (mut exponent, significand) = if biased == 0 {
            // subnormal: bring the leading one up to the hidden position
            let shift = stored.leading_zeros() - (63 - F64_FRACTION_BITS);
            (-1022 - shift as i32, stored << shift)
        } else {
            (biased - 1023, stored | (1u64 << F64_FRACTION_BITS))
        };

        let drop = F64_FRACTION_BITS - self.fraction_bits as u32;
        let mut rounded = (significand + (1u64 << (drop - 1))) >> drop;
        if rounded >> self.significand_bits() != 0 {
            rounded >>= 1;
            exponent += 1;
        }

        if exponent > self.max_exponent() {
            return Err(ConvertError::Overflow(value));
        }
        if exponent < self.min_exponent() {
            return Err(ConvertError::Underflow(value));
        }
        Ok(self.compose(negative, exponent, rounded as u32))
    }

    /// The exact value of a word.
    pub fn decode(&self, word: FloatingWord) -> f64 {
        let fields = self.fields(word);
        if fields.exponent == self.zero_code() {
            return 0.0;
        }
        let significand = f64::from((1u32 << self.fraction_bits) | fields.fraction);
        let magnitude = significand * 2f64.powi(fields.exponent - self.fraction_bits as i32);
        if fields.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}
