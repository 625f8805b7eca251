//! The Z3 floating-point word.
//!
//! A word is `sign | exponent | fraction`, most significant bit first. The
//! exponent is two's complement; its most negative code marks zero. The
//! significand carries a hidden leading one.
//!
//! Native `f64` values only appear at the machine boundary, through
//! [`FloatFormat::encode`] and [`FloatFormat::decode`].

mod format;
mod word;
mod convert;

pub use format::{FloatFormat, FormatError, GUARD_BITS};
pub use word::{Fields, FloatingWord};
pub use convert::ConvertError;
