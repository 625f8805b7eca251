//! Clocked storage: master-slave registers, flags and step chains.
//!
//! Every stored bit is a pair of clocked relays. The master samples its coil
//! network in phase A; the slave copies the master in phase B and is the
//! only one whose contacts the rest of the circuit sees. A register therefore
//! changes at most once per machine cycle, and never while its own next-state
//! network is being sampled.

use super::{Circuit, Lit, Word};
use crate::relay::{NodeId, Phase, RAIL};

/// A master-slave register.
#[derive(Debug, Clone)]
pub struct Register {
    name: String,
    masters: Vec<NodeId>,
    q: Word,
}

impl Register {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.q.len()
    }

    /// Slave contacts, least significant first.
    pub fn q(&self) -> &[Lit] {
        &self.q
    }

    pub fn bit(&self, i: usize) -> Lit {
        self.q[i]
    }
}

/// A one-hot chain of step relays sequencing a unit.
///
/// A pulse on `start` while the chain is idle enters step 0; each cycle then
/// moves the token one step on, and it falls off the end after the last step.
#[derive(Debug, Clone)]
pub struct StepChain {
    steps: Register,
    idle: Lit,
    go: Lit,
}

impl StepChain {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.width()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.width() == 0
    }

    /// Set while step `k` is active.
    pub fn step(&self, k: usize) -> Lit {
        self.steps.bit(k)
    }

    /// Steps `range`, for OR-ing a run of steps together.
    pub fn steps(&self, range: std::ops::Range<usize>) -> &[Lit] {
        &self.steps.q()[range]
    }

    /// The final step.
    pub fn last(&self) -> Lit {
        self.steps.bit(self.len() - 1)
    }

    /// Set while no step is active.
    pub fn idle(&self) -> Lit {
        self.idle
    }

    /// Set while `start` is asserted on an idle chain.
    pub fn go(&self) -> Lit {
        self.go
    }
}

impl Circuit {
    /// A register of `width` master-slave bits, cleared at rest.
    ///
    /// Its next-state network is wired later with [`Circuit::load`] or
    /// [`Circuit::next_state`].
    pub fn register(&mut self, name: &str, width: usize) -> Register {
        let mut masters = Vec::with_capacity(width);
        let mut q = Vec::with_capacity(width);
        for i in 0..width {
            let (master_coil, master) = self.clocked(&format!("{name}{i}.m"), Phase::A);
            let (slave_coil, slave) = self.clocked(&format!("{name}{i}.s"), Phase::B);
            self.series(RAIL, &[master], slave_coil);
            masters.push(master_coil);
            q.push(slave);
        }
        Register {
            name: name.to_string(),
            masters,
            q,
        }
    }

    /// Wire a register's next state as a priority-free set of loads.
    ///
    /// At most one enable may be set at a time; with none set the register
    /// holds its value.
    pub fn load(&mut self, reg: &Register, loads: &[(Lit, &[Lit])]) {
        let hold_term: Vec<Lit> = loads.iter().map(|(en, _)| !*en).collect();
        let hold = self.and(&format!("{}.hold", reg.name), &hold_term);
        for (i, coil) in reg.masters.iter().enumerate() {
            let mut terms: Vec<Vec<Lit>> = loads
                .iter()
                .map(|(en, value)| vec![*en, value[i]])
                .collect();
            terms.push(vec![hold, reg.q[i]]);
            self.feed(*coil, &terms);
        }
    }

    /// Wire one bit's next state directly.
    pub fn next_state(&mut self, reg: &Register, bit: usize, terms: &[Vec<Lit>]) {
        self.feed(reg.masters[bit], terms);
    }

    /// A one-bit register set by `set` and cleared by `clear`; `set` wins.
    pub fn flag(&mut self, name: &str, set: Lit, clear: Lit) -> Lit {
        let reg = self.register(name, 1);
        let q = reg.bit(0);
        self.next_state(&reg, 0, &[vec![set], vec![!clear, q]]);
        q
    }

    /// A step chain of `len` steps entered by `start`.
    pub fn step_chain(&mut self, name: &str, start: Lit, len: usize) -> StepChain {
        let steps = self.register(name, len);
        let idle_term: Vec<Lit> = steps.q().iter().map(|l| !*l).collect();
        let idle = self.and(&format!("{name}.idle"), &idle_term);
        let go = self.and(&format!("{name}.go"), &[start, idle]);
        for k in 0..len {
            let prev = if k == 0 { go } else { steps.bit(k - 1) };
            self.next_state(&steps, k, &[vec![prev]]);
        }
        StepChain { steps, idle, go }
    }
}
