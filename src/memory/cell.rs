//! A latching word cell.
//!
//! One storage relay per bit, clocked in phase B. While `write` is held the
//! relay takes its data bit; otherwise it takes its own make contact and
//! holds. Reading taps the storage contacts and never disturbs them.

use crate::circuit::Circuit;
use crate::float::FloatingWord;
use crate::relay::{
    BuildError, InputId, Netlist, NetlistError, NetlistStats, NodeId, Phase, PhaseClock,
};

/// A word of latching relays with a write pulse.
pub struct LatchCell {
    netlist: Netlist,
    data: Vec<InputId>,
    write: InputId,
    out: Vec<NodeId>,
}

impl LatchCell {
    pub fn build(name: &str, width: usize, iteration_cap: usize) -> Result<Self, BuildError> {
        let mut c = Circuit::new(name);
        let data = c.inputs("d", width);
        let write = c.input("write");
        let mut stored = Vec::with_capacity(width);
        for (i, d) in data.iter().enumerate() {
            let (coil, q) = c.clocked(&format!("S{i}"), Phase::B);
            c.feed(coil, &[vec![write, *d], vec![!write, q]]);
            stored.push(q);
        }
        c.outputs("q", &stored);
        let netlist = c.finish(iteration_cap)?;

        let port = |e: NetlistError| BuildError::UnknownName {
            netlist: name.to_string(),
            kind: "port",
            name: e.to_string(),
        };
        Ok(LatchCell {
            data: netlist.input_bank("d", width).map_err(port)?,
            write: netlist.input("write").map_err(port)?,
            out: netlist.output_bank("q", width).map_err(port)?,
            netlist,
        })
    }

    pub fn name(&self) -> &str {
        self.netlist.name()
    }

    /// The stored word.
    pub fn read(&self) -> FloatingWord {
        FloatingWord::from_bits(self.netlist.read_word(&self.out))
    }

    /// Latch `word`. Only legal while phase B is active.
    pub fn write(&mut self, clock: &PhaseClock, word: FloatingWord) -> Result<(), NetlistError> {
        self.netlist.drive_word(&self.data, word.bits());
        self.netlist.drive(self.write, true);
        let latched = self.netlist.strobe(clock, Phase::B);
        self.netlist.drive(self.write, false);
        latched?;
        self.netlist.settle()?;
        Ok(())
    }

    pub fn stats(&self) -> NetlistStats {
        self.netlist.stats()
    }
}
