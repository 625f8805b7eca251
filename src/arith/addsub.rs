//! Addition and subtraction.
//!
//! Step 0 aligns the operand with the smaller exponent and adds or subtracts
//! magnitudes in one go (both differences are formed, the non-negative one is
//! kept). Step 1 shifts right once on a carry out. The following steps shift
//! left until the leading bit is set; the last step rounds and packs.

use super::datapath::{choose, round_and_pack, zero_word, Datapath, Operand};
use super::TrapCause;
use crate::circuit::word::{shifted_down, shifted_up, sign_extend, zero_extend};
use crate::circuit::{Circuit, Lit, Word};
use crate::float::{FloatFormat, GUARD_BITS};

pub(crate) fn wire(
    c: &mut Circuit,
    format: &FloatFormat,
    x: &Operand,
    y: &Operand,
    start: Lit,
    subtract: bool,
) -> Datapath {
    let e = format.exponent_bits;
    let nw = format.working_bits();
    let xw = format.exponent_work_bits();
    let y_sign = if subtract { !y.sign } else { y.sign };

    // which operand has the larger exponent, and by how much
    let ex = sign_extend(&x.exponent, e + 1);
    let ey = sign_extend(&y.exponent, e + 1);
    let (x_minus_y, _) = c.subtract("dxy", &ex, &ey);
    let (y_minus_x, _) = c.subtract("dyx", &ey, &ex);
    let swap = x_minus_y[e];
    let distance = c.select_word("dist", swap, &y_minus_x, &x_minus_y);

    let sign_a = c.select("sa", swap, y_sign, x.sign);
    let sign_b = c.select("sb", swap, x.sign, y_sign);
    let sig_a = c.select_word("ma", swap, &y.significand, &x.significand);
    let sig_b = c.select_word("mb", swap, &x.significand, &y.significand);
    let exp_a = c.select_word("ea", swap, &y.exponent, &x.exponent);

    let wide_a = shifted_up(&zero_extend(&sig_a, nw), GUARD_BITS);
    let wide_b = shifted_up(&zero_extend(&sig_b, nw), GUARD_BITS);
    let stages = (usize::BITS - (nw - 1).leading_zeros()) as usize;
    let used = stages.min(distance.len());
    let shifted = c.shift_right("align", &wide_b, &distance[..used]);
    let far = c.any("far", &distance[used..]);
    let aligned_b = c.mask_word("near", !far, &shifted);

    let same = c.gate("same", &[vec![sign_a, sign_b], vec![!sign_a, !sign_b]]);
    let (sum, sum_carry) = c.add("sum", &wide_a, &aligned_b, Lit::Const(false));
    let (a_minus_b, a_ge_b) = c.subtract("dab", &wide_a, &aligned_b);
    let (b_minus_a, _) = c.subtract("dba", &aligned_b, &wide_a);
    let magnitude = c.select_word("mag", a_ge_b, &a_minus_b, &b_minus_a);
    let sign_diff = c.select("sd", a_ge_b, sign_a, sign_b);
    let sign = c.select("sr", same, sign_a, sign_diff);

    let mut sum_wide: Word = sum;
    sum_wide.push(sum_carry);
    let magnitude_wide = zero_extend(&magnitude, nw + 1);

    let left_steps = nw - 1;
    let chain = c.step_chain("T", start, left_steps + 3);
    let t_add = chain.step(0);
    let t_right = chain.step(1);
    let t_left = c.any("tl", chain.steps(2..2 + left_steps));

    let s = c.register("S", nw + 1);
    let exp = c.register("E", xw);
    let sgn = c.register("SG", 1);

    let s_zero = c.is_zero("sz", &s.q()[..nw]);
    let add_same = c.and("ls", &[t_add, same]);
    let add_diff = c.and("ld", &[t_add, !same]);
    let right = c.and("rn", &[t_right, s.bit(nw)]);
    let left = c.and("ln", &[t_left, !s.bit(nw - 1), !s_zero]);

    let down = shifted_down(s.q(), 1);
    let up = shifted_up(s.q(), 1);
    c.load(
        &s,
        &[
            (add_same, &sum_wide[..]),
            (add_diff, &magnitude_wide[..]),
            (right, &down[..]),
            (left, &up[..]),
        ],
    );

    let exp_up = c.increment("einc", exp.q(), Lit::Const(true));
    let exp_down = c.decrement("edec", exp.q(), Lit::Const(false));
    let exp_start = sign_extend(&exp_a, xw);
    c.load(
        &exp,
        &[
            (t_add, &exp_start[..]),
            (right, &exp_up[..]),
            (left, &exp_down[..]),
        ],
    );
    c.load(&sgn, &[(t_add, &[sign][..])]);

    let rounded = round_and_pack(c, format, &s.q()[..nw], exp.q(), sgn.bit(0));

    // zero operands bypass the datapath
    let mut y_word = y.bits.clone();
    if let Some(top) = y_word.last_mut() {
        *top = y_sign;
    }
    let pass_x = c.and("px", &[y.zero, !x.zero]);
    let pass_y = c.and("py", &[x.zero, !y.zero]);
    let to_zero = c.gate(
        "pz",
        &[vec![x.zero, y.zero], vec![!x.zero, !y.zero, s_zero]],
    );
    let normal = c.and("pn", &[!x.zero, !y.zero, !s_zero]);
    let zero = zero_word(format);
    let word = choose(
        c,
        "w",
        &[
            (pass_x, &x.bits[..]),
            (pass_y, &y_word[..]),
            (to_zero, &zero[..]),
            (normal, &rounded.word[..]),
        ],
    );

    let overflow = c.and("ov", &[normal, rounded.overflow]);
    let underflow = c.and("un", &[normal, rounded.underflow]);
    Datapath {
        chain,
        word,
        traps: vec![
            (TrapCause::Overflow, overflow),
            (TrapCause::Underflow, underflow),
        ],
    }
}
