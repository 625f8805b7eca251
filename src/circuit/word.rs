//! Word-wide contact networks: adders, selectors, shifters.
//!
//! Words are little-endian vectors of literals. The adder is Zuse's carry
//! chain: each carry node is fed from the rail through the generate contacts
//! of its stage, and from the previous carry node through the propagate
//! contacts. Generate and propagate never conduct together, so no current can
//! flow backwards along the chain.

use super::{simplify, Circuit, Lit, Sop};
use crate::relay::{NodeId, RAIL};

/// A little-endian word of literals.
pub type Word = Vec<Lit>;

/// A constant word.
pub fn constant(value: u64, width: usize) -> Word {
    (0..width)
        .map(|i| Lit::Const(i < 64 && (value >> i) & 1 == 1))
        .collect()
}

/// Complement every literal.
pub fn complement(word: &[Lit]) -> Word {
    word.iter().map(|l| !*l).collect()
}

/// Widen by repeating the top literal.
pub fn sign_extend(word: &[Lit], width: usize) -> Word {
    let top = word.last().copied().unwrap_or(Lit::Const(false));
    let mut out = word.to_vec();
    out.resize(width, top);
    out
}

/// Widen with constant zeros.
pub fn zero_extend(word: &[Lit], width: usize) -> Word {
    let mut out = word.to_vec();
    out.resize(width, Lit::Const(false));
    out
}

/// Shift toward the most significant end by `n`, keeping the width.
pub fn shifted_up(word: &[Lit], n: usize) -> Word {
    let width = word.len();
    let mut out = vec![Lit::Const(false); n.min(width)];
    out.extend_from_slice(&word[..width - n.min(width)]);
    out
}

/// Shift toward the least significant end by `n`, keeping the width.
pub fn shifted_down(word: &[Lit], n: usize) -> Word {
    let width = word.len();
    let mut out: Word = word[n.min(width)..].to_vec();
    out.resize(width, Lit::Const(false));
    out
}

/// State of one carry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Carry {
    Low,
    High,
    Node(NodeId),
}

impl Circuit {
    fn carry_lit(&mut self, name: &str, carry: Carry) -> Lit {
        match carry {
            Carry::Low => Lit::Const(false),
            Carry::High => Lit::Const(true),
            Carry::Node(node) => self.sense(name, node),
        }
    }

    fn carry_stage(&mut self, carry: Carry, x: Lit, y: Lit) -> Carry {
        let generate = simplify(&[vec![x, y]]);
        let propagate = match carry {
            Carry::Low => Sop::Const(false),
            _ => simplify(&[vec![x, !y], vec![!x, y]]),
        };
        match (&generate, &propagate) {
            (Sop::Const(true), _) => return Carry::High,
            (Sop::Const(false), Sop::Const(false)) => return Carry::Low,
            (Sop::Const(false), Sop::Const(true)) => return carry,
            _ => {}
        }

        let node = self.node();
        if let Sop::Terms(terms) = &generate {
            for term in terms {
                self.series(RAIL, term, node);
            }
        }
        let source = match carry {
            Carry::Low => None,
            Carry::High => Some(RAIL),
            Carry::Node(n) => Some(n),
        };
        if let Some(source) = source {
            match &propagate {
                Sop::Terms(terms) => {
                    for term in terms {
                        self.series(source, term, node);
                    }
                }
                Sop::Const(true) => self.builder().wire(source, node),
                Sop::Const(false) => {}
            }
        }
        Carry::Node(node)
    }

    /// `a + b + carry_in`. Returns the sum and the carry out.
    pub fn add(&mut self, name: &str, a: &[Lit], b: &[Lit], carry_in: Lit) -> (Word, Lit) {
        debug_assert_eq!(a.len(), b.len());
        let mut carry = match carry_in {
            Lit::Const(false) => Carry::Low,
            Lit::Const(true) => Carry::High,
            lit => {
                let node = self.node();
                self.series(RAIL, &[lit], node);
                Carry::Node(node)
            }
        };

        let mut sum = Vec::with_capacity(a.len());
        for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
            let c = self.carry_lit(&format!("{name}.c{i}"), carry);
            sum.push(self.gate(
                &format!("{name}.s{i}"),
                &[
                    vec![x, !y, !c],
                    vec![!x, y, !c],
                    vec![!x, !y, c],
                    vec![x, y, c],
                ],
            ));
            carry = self.carry_stage(carry, x, y);
        }
        let out = self.carry_lit(&format!("{name}.c{}", a.len()), carry);
        (sum, out)
    }

    /// `a - b` modulo the width. The carry out is set iff `a >= b`.
    pub fn subtract(&mut self, name: &str, a: &[Lit], b: &[Lit]) -> (Word, Lit) {
        self.add(name, a, &complement(b), Lit::Const(true))
    }

    /// `a + carry`, modulo the width.
    pub fn increment(&mut self, name: &str, a: &[Lit], carry: Lit) -> Word {
        self.add(name, a, &constant(0, a.len()), carry).0
    }

    /// `a - 1 + carry`, modulo the width.
    pub fn decrement(&mut self, name: &str, a: &[Lit], carry: Lit) -> Word {
        self.add(name, a, &constant(u64::MAX, a.len()), carry).0
    }

    /// `sel ? a : b`, bit by bit.
    pub fn select_word(&mut self, name: &str, sel: Lit, a: &[Lit], b: &[Lit]) -> Word {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .enumerate()
            .map(|(i, (&x, &y))| self.select(&format!("{name}{i}"), sel, x, y))
            .collect()
    }

    /// `en ? a : 0`
    pub fn mask_word(&mut self, name: &str, en: Lit, a: &[Lit]) -> Word {
        a.iter()
            .enumerate()
            .map(|(i, &x)| self.and(&format!("{name}{i}"), &[en, x]))
            .collect()
    }

    /// Set iff some bit of `a` is set.
    pub fn any(&mut self, name: &str, a: &[Lit]) -> Lit {
        self.or(name, a)
    }

    /// Set iff every bit of `a` is clear.
    pub fn is_zero(&mut self, name: &str, a: &[Lit]) -> Lit {
        self.and(name, &complement(a))
    }

    /// Logarithmic right shifter: stage `k` moves the word down by `2^k`
    /// when `amount[k]` is set.
    pub fn shift_right(&mut self, name: &str, a: &[Lit], amount: &[Lit]) -> Word {
        let mut word = a.to_vec();
        for (k, &bit) in amount.iter().enumerate() {
            let moved = shifted_down(&word, 1usize << k.min(usize::BITS as usize - 1));
            word = self.select_word(&format!("{name}.{k}."), bit, &moved, &word);
        }
        word
    }
}
