//! Contact-logic construction on top of [`NetlistBuilder`].
//!
//! Everything the arithmetic and control units compute is expressed as
//! series/parallel contact networks:
//! - a [`Lit`] is a single contact (or a constant that needs none)
//! - a gate is a sum of products: one series path per product, all paths
//!   ending on the gate node, read back through a `Follow` relay
//! - word operations ([`word`]) and clocked registers ([`register`]) are
//!   built from gates
//!
//! Constants are folded at build time, so a gate whose value is fixed costs
//! no relay at all.

pub mod word;
pub mod register;

use std::collections::HashMap;
use std::ops::Not;

use crate::relay::{
    BuildError, Drive, Netlist, NetlistBuilder, NodeId, Phase, Polarity, RelayId, RAIL,
};

pub use register::{Register, StepChain};
pub use word::Word;

/// A contact literal: the level of one relay as seen through one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lit {
    /// A fixed level; needs no contact.
    Const(bool),
    /// A contact of `relay` with the given polarity.
    Contact(RelayId, Polarity),
}

impl Lit {
    /// Conducts while the relay is driven.
    pub const fn on(relay: RelayId) -> Lit {
        Lit::Contact(relay, Polarity::NormallyOpen)
    }

    /// Conducts while the relay is released.
    pub const fn off(relay: RelayId) -> Lit {
        Lit::Contact(relay, Polarity::NormallyClosed)
    }

    /// The constant value, if this literal is fixed.
    pub const fn constant(self) -> Option<bool> {
        match self {
            Lit::Const(v) => Some(v),
            Lit::Contact(..) => None,
        }
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        match self {
            Lit::Const(v) => Lit::Const(!v),
            Lit::Contact(relay, polarity) => Lit::Contact(relay, polarity.flip()),
        }
    }
}

/// A sum of products after constant folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sop {
    Const(bool),
    Terms(Vec<Vec<Lit>>),
}

/// Fold constants and contradictions out of a sum of products.
pub(crate) fn simplify(terms: &[Vec<Lit>]) -> Sop {
    let mut out: Vec<Vec<Lit>> = Vec::with_capacity(terms.len());
    'terms: for term in terms {
        let mut lits: Vec<Lit> = Vec::with_capacity(term.len());
        for &lit in term {
            match lit {
                Lit::Const(true) => {}
                Lit::Const(false) => continue 'terms,
                contact => {
                    if lits.contains(&!contact) {
                        continue 'terms;
                    }
                    if !lits.contains(&contact) {
                        lits.push(contact);
                    }
                }
            }
        }
        if lits.is_empty() {
            return Sop::Const(true);
        }
        if !out.contains(&lits) {
            out.push(lits);
        }
    }
    if out.is_empty() {
        Sop::Const(false)
    } else {
        Sop::Terms(out)
    }
}

/// Builder for contact-logic netlists.
pub struct Circuit {
    net: NetlistBuilder,
    names: HashMap<String, usize>,
    sensed: HashMap<NodeId, Lit>,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        Circuit {
            net: NetlistBuilder::new(name),
            names: HashMap::new(),
            sensed: HashMap::new(),
        }
    }

    /// Direct access to the underlying builder.
    pub fn builder(&mut self) -> &mut NetlistBuilder {
        &mut self.net
    }

    /// A fresh anonymous node.
    pub fn node(&mut self) -> NodeId {
        self.net.node()
    }

    /// Unique relay name derived from `base`.
    fn unique(&mut self, base: &str) -> String {
        let count = self.names.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{base}~{count}")
        }
    }

    /// Add a relay with a unique name.
    pub fn relay(&mut self, name: &str, coil: NodeId, drive: Drive) -> RelayId {
        let name = self.unique(name);
        self.net.relay(name, coil, drive)
    }

    /// An external input, sensed through its own relay.
    pub fn input(&mut self, name: &str) -> Lit {
        let node = self.net.input(name);
        self.sense(name, node)
    }

    /// A bank of inputs `prefix0 .. prefix{width-1}`.
    pub fn inputs(&mut self, prefix: &str, width: usize) -> Word {
        (0..width).map(|i| self.input(&format!("{prefix}{i}"))).collect()
    }

    /// Literal for the level of `node`, through a `Follow` relay on it.
    pub fn sense(&mut self, name: &str, node: NodeId) -> Lit {
        if let Some(lit) = self.sensed.get(&node) {
            return *lit;
        }
        let relay = self.relay(name, node, Drive::Follow);
        let lit = Lit::on(relay);
        self.sensed.insert(node, lit);
        lit
    }

    /// A relay clocked on `phase` with a fresh coil node.
    pub fn clocked(&mut self, name: &str, phase: Phase) -> (NodeId, Lit) {
        let coil = self.node();
        let relay = self.relay(name, coil, Drive::Clocked(phase));
        (coil, Lit::on(relay))
    }

    /// Wire a series path of contacts from `from` to `to`.
    ///
    /// Constant-true literals are bridged; a path containing a constant-false
    /// literal is not wired at all.
    pub fn series(&mut self, from: NodeId, term: &[Lit], to: NodeId) {
        if term.iter().any(|l| *l == Lit::Const(false)) {
            return;
        }
        let contacts: Vec<(RelayId, Polarity)> = term
            .iter()
            .filter_map(|l| match *l {
                Lit::Contact(r, p) => Some((r, p)),
                Lit::Const(_) => None,
            })
            .collect();
        if contacts.is_empty() {
            self.net.wire(from, to);
            return;
        }
        let mut at = from;
        for (i, (relay, polarity)) in contacts.iter().enumerate() {
            let next = if i + 1 == contacts.len() {
                to
            } else {
                self.net.node()
            };
            self.net.contact(*relay, *polarity, at, next);
            at = next;
        }
    }

    /// A literal that never conducts but still wires its path.
    fn open(&mut self) -> Lit {
        // break contact of a relay held by the rail
        !self.sense("rail", RAIL)
    }

    /// Feed `node` from the rail through a sum of products.
    pub fn feed(&mut self, node: NodeId, terms: &[Vec<Lit>]) {
        match simplify(terms) {
            Sop::Const(true) => self.net.wire(RAIL, node),
            Sop::Const(false) => {
                let open = self.open();
                self.series(RAIL, &[open], node);
            }
            Sop::Terms(terms) => {
                for term in &terms {
                    self.series(RAIL, term, node);
                }
            }
        }
    }

    /// A sum-of-products gate.
    ///
    /// Folds to a constant or to an existing literal when possible, else
    /// wires a new gate node and senses it.
    pub fn gate(&mut self, name: &str, terms: &[Vec<Lit>]) -> Lit {
        match simplify(terms) {
            Sop::Const(v) => Lit::Const(v),
            Sop::Terms(terms) if terms.len() == 1 && terms[0].len() == 1 => terms[0][0],
            Sop::Terms(terms) => {
                let node = self.node();
                for term in &terms {
                    self.series(RAIL, term, node);
                }
                self.sense(name, node)
            }
        }
    }

    /// `a AND b AND ...`
    pub fn and(&mut self, name: &str, lits: &[Lit]) -> Lit {
        self.gate(name, &[lits.to_vec()])
    }

    /// `a OR b OR ...`
    pub fn or(&mut self, name: &str, lits: &[Lit]) -> Lit {
        let terms: Vec<Vec<Lit>> = lits.iter().map(|l| vec![*l]).collect();
        self.gate(name, &terms)
    }

    /// `a XOR b`
    pub fn xor(&mut self, name: &str, a: Lit, b: Lit) -> Lit {
        self.gate(name, &[vec![a, !b], vec![!a, b]])
    }

    /// `sel ? a : b`
    pub fn select(&mut self, name: &str, sel: Lit, a: Lit, b: Lit) -> Lit {
        if a == b {
            return a;
        }
        self.gate(name, &[vec![sel, a], vec![!sel, b]])
    }

    /// Expose a literal as a named output node.
    pub fn output(&mut self, name: &str, lit: Lit) {
        let node = self.net.named_node(name);
        self.feed(node, &[vec![lit]]);
        self.net.output(name, node);
    }

    /// Outputs `prefix0 .. prefix{n-1}`.
    pub fn outputs(&mut self, prefix: &str, word: &[Lit]) {
        for (i, lit) in word.iter().enumerate() {
            self.output(&format!("{prefix}{i}"), *lit);
        }
    }

    /// Number of relays placed so far.
    pub fn relay_count(&self) -> usize {
        self.net.relay_count()
    }

    /// Freeze the netlist and settle it into its rest state.
    pub fn finish(self, iteration_cap: usize) -> Result<Netlist, BuildError> {
        let mut netlist = self.net.build(iteration_cap)?;
        netlist
            .settle()
            .map_err(|_| BuildError::Unstable {
                netlist: netlist.name().to_string(),
                passes: iteration_cap,
            })?;
        Ok(netlist)
    }
}
