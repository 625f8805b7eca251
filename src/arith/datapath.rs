//! Pieces shared by every operation unit: operand unpacking, rounding and
//! packing, and the result/flag registers around a finished datapath.

use super::TrapCause;
use crate::circuit::word::{complement, constant};
use crate::circuit::{Circuit, Lit, StepChain, Word};
use crate::float::{FloatFormat, GUARD_BITS};
use crate::relay::{Drive, RAIL};

/// An operand word split into its fields.
pub(crate) struct Operand {
    pub bits: Word,
    pub sign: Lit,
    /// Two's complement exponent field.
    pub exponent: Word,
    /// Fraction with the hidden one on top.
    pub significand: Word,
    pub zero: Lit,
}

/// Sense an operand input bank and unpack it.
pub(crate) fn operand(c: &mut Circuit, name: &str, format: &FloatFormat) -> Operand {
    let m = format.fraction_bits;
    let e = format.exponent_bits;
    let bits = c.inputs(name, format.width());
    let exponent = bits[m..m + e].to_vec();
    let mut significand = bits[..m].to_vec();
    significand.push(Lit::Const(true));

    let mut zero_code = vec![exponent[e - 1]];
    zero_code.extend(complement(&exponent[..e - 1]));
    let zero = c.and(&format!("{name}.zero"), &zero_code);

    Operand {
        sign: bits[m + e],
        bits,
        exponent,
        significand,
        zero,
    }
}

/// A packed result with its range flags.
pub(crate) struct Rounded {
    pub word: Word,
    pub overflow: Lit,
    pub underflow: Lit,
}

/// Round a normalized significand (with guard bits) half-up, apply the
/// rounding carry to the exponent and pack the word.
pub(crate) fn round_and_pack(
    c: &mut Circuit,
    format: &FloatFormat,
    significand: &[Lit],
    exponent: &[Lit],
    negative: Lit,
) -> Rounded {
    let m = format.fraction_bits;
    let e = format.exponent_bits;
    let xw = exponent.len();
    debug_assert_eq!(significand.len(), format.working_bits());

    let kept = &significand[GUARD_BITS - 1..];
    let (rounded, carry) = c.add("round", kept, &constant(0, kept.len()), Lit::Const(true));
    let exponent = c.increment("round.e", exponent, carry);

    // representable iff bits e-1 .. xw-1 all equal the sign and the value is
    // not the zero code
    let neg = exponent[xw - 1];
    let high = &exponent[e - 1..xw - 1];
    let overflow_terms: Vec<Vec<Lit>> = high.iter().map(|h| vec![!neg, *h]).collect();
    let mut underflow_terms: Vec<Vec<Lit>> = high.iter().map(|h| vec![neg, !*h]).collect();
    let mut at_zero_code = vec![neg];
    at_zero_code.extend(complement(&exponent[..e - 1]));
    underflow_terms.push(at_zero_code);
    let overflow = c.gate("ovf", &overflow_terms);
    let underflow = c.gate("unf", &underflow_terms);

    let mut word: Word = rounded[1..=m].to_vec();
    word.extend_from_slice(&exponent[..e]);
    word.push(negative);
    Rounded {
        word,
        overflow,
        underflow,
    }
}

/// The canonical zero as a constant word.
pub(crate) fn zero_word(format: &FloatFormat) -> Word {
    constant(u64::from(format.zero().bits()), format.width())
}

/// Merge mutually exclusive candidate words: `case_i ? word_i` for the one
/// case that holds.
pub(crate) fn choose(c: &mut Circuit, name: &str, cases: &[(Lit, &[Lit])]) -> Word {
    let width = cases.first().map_or(0, |(_, w)| w.len());
    (0..width)
        .map(|i| {
            let terms: Vec<Vec<Lit>> = cases.iter().map(|(case, w)| vec![*case, w[i]]).collect();
            c.gate(&format!("{name}{i}"), &terms)
        })
        .collect()
}

/// What an operation's datapath hands to the common completion logic.
pub(crate) struct Datapath {
    pub chain: StepChain,
    /// Result word, valid during the last step unless a trap is set.
    pub word: Word,
    pub traps: Vec<(TrapCause, Lit)>,
}

/// Wire the result register, the done and trap flags and the output ports.
pub(crate) fn complete(c: &mut Circuit, start: Lit, datapath: &Datapath) {
    let chain = &datapath.chain;
    let fin = chain.last();
    let go = chain.go();

    let trap_lits: Vec<Lit> = datapath.traps.iter().map(|(_, l)| *l).collect();
    let trapped = c.or("trapped", &trap_lits);
    let store = c.and("store", &[fin, !trapped]);
    let result = c.register("R", datapath.word.len());
    c.load(&result, &[(store, &datapath.word[..])]);
    c.outputs("r", result.q());

    let done = c.flag("done", fin, go);
    let ready = c.and("ready", &[done, !start]);
    c.output("done", ready);
    c.output("busy", !chain.idle());

    for (cause, lit) in &datapath.traps {
        let set = c.and(&format!("{}.set", cause.port()), &[fin, *lit]);
        let flag = c.flag(cause.port(), set, go);
        c.output(cause.port(), flag);
    }
}

/// Wire a relay that chops its own coil current while `start` is held.
pub(crate) fn buzzer(c: &mut Circuit, start: Lit) {
    let coil = c.node();
    let relay = c.relay("buzz", coil, Drive::Follow);
    c.series(RAIL, &[start, Lit::off(relay)], coil);
}
