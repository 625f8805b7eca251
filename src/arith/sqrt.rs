//! Square root: digit-by-digit restoring root, one result bit per step.
//!
//! An odd exponent doubles the radicand so the halved exponent is exact.

use super::datapath::{choose, round_and_pack, zero_word, Datapath, Operand};
use super::TrapCause;
use crate::circuit::word::{constant, shifted_up, sign_extend, zero_extend};
use crate::circuit::{Circuit, Lit, Word};
use crate::float::FloatFormat;

pub(crate) fn wire(c: &mut Circuit, format: &FloatFormat, x: &Operand, start: Lit) -> Datapath {
    let p = format.significand_bits();
    let nb = format.working_bits();
    let rw = p + 1;
    let xw = format.exponent_work_bits();

    let chain = c.step_chain("T", start, nb + 2);
    let t_init = chain.step(0);
    let t_iter = c.any("ti", chain.steps(1..nb + 1));

    let rad = c.register("RD", rw);
    let rem = c.register("RM", nb + 2);
    let root = c.register("RT", nb);
    let exp = c.register("E", xw);

    let odd = x.exponent[0];
    let plain = zero_extend(&x.significand, rw);
    let doubled = shifted_up(&plain, 1);
    let radicand = c.select_word("rd", odd, &doubled, &plain);
    let halved = sign_extend(&x.exponent[1..], xw);

    // bring down the next pair of radicand bits and try (root << 2) | 1
    let mut widened: Word = vec![rad.bit(rw - 2), rad.bit(rw - 1)];
    widened.extend_from_slice(rem.q());
    let mut trial: Word = vec![Lit::Const(true), Lit::Const(false)];
    trial.extend_from_slice(root.q());
    let trial = zero_extend(&trial, widened.len());
    let (diff, fits) = c.subtract("trial", &widened, &trial);
    let kept = c.select_word("keep", fits, &diff[..nb + 2], &widened[..nb + 2]);
    let mut root_next: Word = vec![fits];
    root_next.extend_from_slice(&root.q()[..nb - 1]);
    let rad_next = shifted_up(rad.q(), 2);

    let cleared_rem = constant(0, nb + 2);
    let cleared_root = constant(0, nb);
    c.load(&rad, &[(t_init, &radicand[..]), (t_iter, &rad_next[..])]);
    c.load(&rem, &[(t_init, &cleared_rem[..]), (t_iter, &kept[..])]);
    c.load(&root, &[(t_init, &cleared_root[..]), (t_iter, &root_next[..])]);
    c.load(&exp, &[(t_init, &halved[..])]);

    let rounded = round_and_pack(c, format, root.q(), exp.q(), Lit::Const(false));

    let negative = c.and("neg", &[x.sign, !x.zero]);
    let normal = c.and("n", &[!x.sign, !x.zero]);
    let zero_result = zero_word(format);
    let word = choose(
        c,
        "w",
        &[(x.zero, &zero_result[..]), (normal, &rounded.word[..])],
    );

    let overflow = c.and("ov", &[normal, rounded.overflow]);
    let underflow = c.and("un", &[normal, rounded.underflow]);
    Datapath {
        chain,
        word,
        traps: vec![
            (TrapCause::NegativeRoot, negative),
            (TrapCause::Overflow, overflow),
            (TrapCause::Underflow, underflow),
        ],
    }
}
