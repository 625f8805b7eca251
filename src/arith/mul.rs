//! Multiplication: one shift-and-add step per multiplier bit.

use super::datapath::{choose, round_and_pack, zero_word, Datapath, Operand};
use super::TrapCause;
use crate::circuit::word::{constant, sign_extend};
use crate::circuit::{Circuit, Lit, Word};
use crate::float::{FloatFormat, GUARD_BITS};

pub(crate) fn wire(
    c: &mut Circuit,
    format: &FloatFormat,
    x: &Operand,
    y: &Operand,
    start: Lit,
) -> Datapath {
    let p = format.significand_bits();
    let g = GUARD_BITS;
    let xw = format.exponent_work_bits();

    let chain = c.step_chain("T", start, p + 2);
    let t_init = chain.step(0);
    let t_iter = c.any("ti", chain.steps(1..p + 1));

    // ACC:Q is the double-length product, Q starts out holding the multiplier
    let acc = c.register("A", p);
    let q = c.register("Q", p);
    let exp = c.register("E", xw);

    let addend = c.mask_word("md", q.bit(0), &x.significand);
    let (partial, carry) = c.add("acc", acc.q(), &addend, Lit::Const(false));
    let mut acc_next: Word = partial[1..].to_vec();
    acc_next.push(carry);
    let mut q_next: Word = q.q()[1..].to_vec();
    q_next.push(partial[0]);

    let exp_sum = c
        .add(
            "esum",
            &sign_extend(&x.exponent, xw),
            &sign_extend(&y.exponent, xw),
            Lit::Const(false),
        )
        .0;

    let cleared = constant(0, p);
    c.load(&acc, &[(t_init, &cleared[..]), (t_iter, &acc_next[..])]);
    c.load(&q, &[(t_init, &y.significand[..]), (t_iter, &q_next[..])]);
    c.load(&exp, &[(t_init, &exp_sum[..])]);

    let mut product: Word = q.q().to_vec();
    product.extend_from_slice(acc.q());
    let top = acc.bit(p - 1);
    let significand = c.select_word(
        "nm",
        top,
        &product[p - g..2 * p],
        &product[p - 1 - g..2 * p - 1],
    );
    let exponent = c.increment("en", exp.q(), top);
    let sign = c.xor("sign", x.sign, y.sign);
    let rounded = round_and_pack(c, format, &significand, &exponent, sign);

    let zero = c.or("z", &[x.zero, y.zero]);
    let zero_result = zero_word(format);
    let word = choose(
        c,
        "w",
        &[(zero, &zero_result[..]), (!zero, &rounded.word[..])],
    );

    let overflow = c.and("ov", &[!zero, rounded.overflow]);
    let underflow = c.and("un", &[!zero, rounded.underflow]);
    Datapath {
        chain,
        word,
        traps: vec![
            (TrapCause::Overflow, overflow),
            (TrapCause::Underflow, underflow),
        ],
    }
}
