//! Integer reference model of the floating-point units.
//!
//! Works on raw word bits with `u128` significands, independent of the relay
//! netlists: two guard bits, truncation below them, round half-up at the
//! first guard bit, hidden bit, two's-complement exponent with the most
//! negative code meaning zero.

#![allow(dead_code)]

use proptest::prelude::*;
use z3::arith::{Operation, TrapCause};
use z3::float::FloatFormat;

const G: u32 = 2;

pub struct Unpacked {
    pub negative: bool,
    pub exponent: i64,
    /// Significand with the hidden bit, `P` bits.
    pub significand: u128,
    pub zero: bool,
}

fn mask(bits: u32) -> u128 {
    (1u128 << bits) - 1
}

fn widths(f: FloatFormat) -> (u32, u32, u32) {
    let m = f.fraction_bits as u32;
    let e = f.exponent_bits as u32;
    (m, e, m + 1 + e)
}

pub fn unpack(f: FloatFormat, word: u32) -> Unpacked {
    let (m, e, w) = widths(f);
    let raw = (u128::from(word) >> m) & mask(e);
    let exponent = if raw >> (e - 1) == 1 {
        raw as i64 - (1i64 << e)
    } else {
        raw as i64
    };
    Unpacked {
        negative: (word >> (w - 1)) & 1 == 1,
        exponent,
        significand: (u128::from(word) & mask(m)) | (1u128 << m),
        zero: exponent == -(1i64 << (e - 1)),
    }
}

pub fn zero(f: FloatFormat) -> u32 {
    let (m, e, _) = widths(f);
    1 << (m + e - 1)
}

pub fn compose(f: FloatFormat, negative: bool, exponent: i64, fraction: u128) -> u32 {
    let (m, e, w) = widths(f);
    let exp_bits = (exponent as u128) & mask(e);
    ((u128::from(negative) << (w - 1)) | (exp_bits << m) | (fraction & mask(m))) as u32
}

/// Round a significand of `P + G` bits, leading bit set, and pack it.
fn round_pack(f: FloatFormat, t: u128, exponent: i64, negative: bool) -> Result<u32, TrapCause> {
    let (m, e, _) = widths(f);
    let p = m + 1;
    let v = t >> (G - 1);
    let inc = v + 1;
    let carry = (inc >> (p + 1)) as i64;
    let fraction = (inc >> 1) & mask(m);
    let exponent = exponent + carry;
    let max = (1i64 << (e - 1)) - 1;
    if exponent > max {
        return Err(TrapCause::Overflow);
    }
    if exponent < -max {
        return Err(TrapCause::Underflow);
    }
    Ok(compose(f, negative, exponent, fraction))
}

fn isqrt(n: u128) -> u128 {
    let mut root = 0u128;
    let mut bit = 1u128 << 126;
    let mut rem = n;
    while bit > n {
        bit >>= 2;
    }
    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

pub fn add(f: FloatFormat, x: u32, y: u32, subtract: bool) -> Result<u32, TrapCause> {
    let (m, _, w) = widths(f);
    let nw = m + 1 + G;
    let a = unpack(f, x);
    let mut b = unpack(f, y);
    if subtract {
        b.negative = !b.negative;
    }
    match (a.zero, b.zero) {
        (true, true) => return Ok(zero(f)),
        (false, true) => return Ok(x),
        (true, false) => {
            let sign_bit = 1u32 << (w - 1);
            return Ok((y & !sign_bit) | if b.negative { sign_bit } else { 0 });
        }
        (false, false) => {}
    }

    let (a, b) = if a.exponent < b.exponent { (b, a) } else { (a, b) };
    let d = (a.exponent - b.exponent) as u32;
    let aw = a.significand << G;
    let bw = if d >= nw { 0 } else { (b.significand << G) >> d };

    let (mut t, negative) = if a.negative == b.negative {
        (aw + bw, a.negative)
    } else if aw >= bw {
        (aw - bw, a.negative)
    } else {
        (bw - aw, b.negative)
    };
    if t == 0 {
        return Ok(zero(f));
    }
    let mut exponent = a.exponent;
    if t >> nw & 1 == 1 {
        t >>= 1;
        exponent += 1;
    }
    while t >> (nw - 1) & 1 == 0 {
        t <<= 1;
        exponent -= 1;
    }
    round_pack(f, t, exponent, negative)
}

pub fn mul(f: FloatFormat, x: u32, y: u32) -> Result<u32, TrapCause> {
    let p = f.fraction_bits as u32 + 1;
    let a = unpack(f, x);
    let b = unpack(f, y);
    if a.zero || b.zero {
        return Ok(zero(f));
    }
    let n = a.significand * b.significand;
    let mut exponent = a.exponent + b.exponent;
    let t = if n >> (2 * p - 1) & 1 == 1 {
        exponent += 1;
        n >> (p - G)
    } else {
        n >> (p - 1 - G)
    };
    round_pack(f, t, exponent, a.negative != b.negative)
}

pub fn div(f: FloatFormat, x: u32, y: u32) -> Result<u32, TrapCause> {
    let k = f.fraction_bits as u32 + 1 + G + 1;
    let a = unpack(f, x);
    let b = unpack(f, y);
    if b.zero {
        return Err(TrapCause::ZeroDivisor);
    }
    if a.zero {
        return Ok(zero(f));
    }
    let q = (a.significand << (k - 1)) / b.significand;
    let mut exponent = a.exponent - b.exponent;
    let t = if q >> (k - 1) & 1 == 1 {
        q >> 1
    } else {
        exponent -= 1;
        q
    };
    round_pack(f, t, exponent, a.negative != b.negative)
}

pub fn sqrt(f: FloatFormat, x: u32) -> Result<u32, TrapCause> {
    let m = f.fraction_bits as u32;
    let a = unpack(f, x);
    if a.zero {
        return Ok(zero(f));
    }
    if a.negative {
        return Err(TrapCause::NegativeRoot);
    }
    let radicand = if a.exponent & 1 == 1 {
        a.significand << 1
    } else {
        a.significand
    };
    let root = isqrt(radicand << (m + 2 * G));
    round_pack(f, root, a.exponent >> 1, false)
}

pub fn reference(op: Operation, f: FloatFormat, x: u32, y: u32) -> Result<u32, TrapCause> {
    match op {
        Operation::Add => add(f, x, y, false),
        Operation::Subtract => add(f, x, y, true),
        Operation::Multiply => mul(f, x, y),
        Operation::Divide => div(f, x, y),
        Operation::SquareRoot => sqrt(f, x),
    }
}

/// Words with exponents in `-range..=range`, and now and then a zero.
pub fn word(f: FloatFormat, range: i64) -> impl Strategy<Value = u32> {
    let fraction = 0u128..(1u128 << f.fraction_bits);
    prop_oneof![
        12 => (any::<bool>(), -range..=range, fraction)
            .prop_map(move |(negative, exponent, fraction)| compose(f, negative, exponent, fraction)),
        1 => any::<bool>().prop_map(move |negative| {
            let (_, _, w) = widths(f);
            zero(f) | if negative { 1 << (w - 1) } else { 0 }
        }),
    ]
}
