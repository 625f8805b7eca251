//! The address selector pyramid.
//!
//! Changeover contacts of the six address relays form a binary tree below
//! the request relay: the top level switches on the most significant address
//! bit, each level doubles the branches, and exactly one of the 64 leaves is
//! energized for any address while a request is held.

use crate::circuit::{Circuit, Lit};
use crate::relay::{BuildError, InputId, Netlist, NetlistError, NetlistStats, NodeId, RAIL};

use super::{ADDRESS_BITS, CELL_COUNT};

pub struct AddressSelector {
    netlist: Netlist,
    address: Vec<InputId>,
    request: InputId,
    lines: Vec<NodeId>,
}

impl AddressSelector {
    pub fn build(iteration_cap: usize) -> Result<Self, BuildError> {
        let mut c = Circuit::new("selector");
        let address = c.inputs("a", ADDRESS_BITS);
        let request = c.input("request");

        let root = c.node();
        c.series(RAIL, &[request], root);
        let mut level = vec![root];
        for bit in (0..ADDRESS_BITS).rev() {
            let relay = match address[bit] {
                Lit::Contact(relay, _) => relay,
                Lit::Const(_) => continue,
            };
            let mut next = Vec::with_capacity(level.len() * 2);
            for pole in &level {
                let (make, brk) = c.builder().changeover(relay, *pole);
                next.push(brk);
                next.push(make);
            }
            level = next;
        }
        for (line, node) in level.iter().enumerate() {
            c.builder().output(format!("line{line}"), *node);
        }
        let netlist = c.finish(iteration_cap)?;

        let port = |e: NetlistError| BuildError::UnknownName {
            netlist: "selector".to_string(),
            kind: "port",
            name: e.to_string(),
        };
        Ok(AddressSelector {
            address: netlist.input_bank("a", ADDRESS_BITS).map_err(port)?,
            request: netlist.input("request").map_err(port)?,
            lines: netlist.output_bank("line", CELL_COUNT).map_err(port)?,
            netlist,
        })
    }

    /// Hold a request for `address` and report the energized select line.
    ///
    /// Returns `None` if no line, or more than one, is energized.
    pub fn select(&mut self, address: usize) -> Result<Option<usize>, NetlistError> {
        self.netlist.drive_word(&self.address, address as u32);
        self.netlist.drive(self.request, true);
        self.netlist.settle_if_dirty()?;
        let mut energized = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, node)| self.netlist.read(**node))
            .map(|(line, _)| line);
        let line = energized.next();
        if energized.next().is_some() {
            return Ok(None);
        }
        Ok(line)
    }

    /// Drop the request.
    pub fn release(&mut self) -> Result<(), NetlistError> {
        self.netlist.drive(self.request, false);
        self.netlist.settle_if_dirty()?;
        Ok(())
    }

    pub fn stats(&self) -> NetlistStats {
        self.netlist.stats()
    }
}
