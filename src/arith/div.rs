//! Division: restoring division, one quotient bit per step.
//!
//! `P + G + 1` quotient bits are developed so that either normalization
//! leaves `P + G` bits for rounding.

use super::datapath::{choose, round_and_pack, zero_word, Datapath, Operand};
use super::TrapCause;
use crate::circuit::word::{constant, shifted_up, sign_extend, zero_extend};
use crate::circuit::{Circuit, Lit, Word};
use crate::float::FloatFormat;

pub(crate) fn wire(
    c: &mut Circuit,
    format: &FloatFormat,
    x: &Operand,
    y: &Operand,
    start: Lit,
) -> Datapath {
    let p = format.significand_bits();
    let k = format.working_bits() + 1;
    let xw = format.exponent_work_bits();

    let chain = c.step_chain("T", start, k + 2);
    let t_init = chain.step(0);
    let t_iter = c.any("ti", chain.steps(1..k + 1));

    let rem = c.register("RM", p + 1);
    let quo = c.register("QT", k);
    let exp = c.register("E", xw);

    let divisor = zero_extend(&y.significand, p + 1);
    let (diff, fits) = c.subtract("trial", rem.q(), &divisor);
    let kept = c.select_word("keep", fits, &diff, rem.q());
    let rem_next = shifted_up(&kept, 1);
    let mut quo_next: Word = vec![fits];
    quo_next.extend_from_slice(&quo.q()[..k - 1]);

    let exp_diff = c
        .subtract(
            "ediff",
            &sign_extend(&x.exponent, xw),
            &sign_extend(&y.exponent, xw),
        )
        .0;

    let dividend = zero_extend(&x.significand, p + 1);
    let cleared = constant(0, k);
    c.load(&rem, &[(t_init, &dividend[..]), (t_iter, &rem_next[..])]);
    c.load(&quo, &[(t_init, &cleared[..]), (t_iter, &quo_next[..])]);
    c.load(&exp, &[(t_init, &exp_diff[..])]);

    let top = quo.bit(k - 1);
    let significand = c.select_word("nm", top, &quo.q()[1..k], &quo.q()[..k - 1]);
    let exponent = c.decrement("en", exp.q(), top);
    let sign = c.xor("sign", x.sign, y.sign);
    let rounded = round_and_pack(c, format, &significand, &exponent, sign);

    let zero = c.and("z", &[x.zero, !y.zero]);
    let normal = c.and("n", &[!x.zero, !y.zero]);
    let zero_result = zero_word(format);
    let word = choose(
        c,
        "w",
        &[(zero, &zero_result[..]), (normal, &rounded.word[..])],
    );

    let overflow = c.and("ov", &[normal, rounded.overflow]);
    let underflow = c.and("un", &[normal, rounded.underflow]);
    Datapath {
        chain,
        word,
        traps: vec![
            (TrapCause::ZeroDivisor, y.zero),
            (TrapCause::Overflow, overflow),
            (TrapCause::Underflow, underflow),
        ],
    }
}
