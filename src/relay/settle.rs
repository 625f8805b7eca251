//! The settling engine.
//!
//! A pass floods energy from every source (the rail and each input driven
//! high) across conducting contacts and wires, then lets every `Follow` coil
//! take the level of its coil node. A netlist has settled when a pass flips
//! no coil. Clocked coils only move in [`Netlist::strobe`].

use tracing::{event, Level};

use super::clock::{Phase, PhaseClock};
use super::netlist::{Link, Netlist, NetlistError, NodeId, RAIL};

/// Outcome of a successful settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    /// Relaxation passes run; zero when nothing had to move.
    pub passes: usize,
}

impl Netlist {
    /// Flood node energization from the sources into `out`.
    fn propagate(&self, out: &mut Vec<bool>, stack: &mut Vec<NodeId>) {
        out.clear();
        out.resize(self.energized.len(), false);
        stack.clear();

        out[RAIL.index()] = true;
        stack.push(RAIL);
        for (i, (_, node)) in self.inputs.iter().enumerate() {
            if self.driven[i] && !out[node.index()] {
                out[node.index()] = true;
                stack.push(*node);
            }
        }

        while let Some(node) = stack.pop() {
            for &(link, next) in &self.adjacency[node.index()] {
                if out[next.index()] {
                    continue;
                }
                let conducts = match link {
                    Link::Wire => true,
                    Link::Contact(c) => {
                        let contact = &self.contacts[c];
                        contact
                            .polarity
                            .conducts(self.relays[contact.relay.index()].driven)
                    }
                };
                if conducts {
                    out[next.index()] = true;
                    stack.push(next);
                }
            }
        }
    }

    /// Relax the netlist to its steady state.
    pub fn settle(&mut self) -> Result<Settled, NetlistError> {
        let mut next = std::mem::take(&mut self.scratch);
        let mut stack = Vec::new();

        for pass in 1..=self.iteration_cap {
            self.propagate(&mut next, &mut stack);
            std::mem::swap(&mut self.energized, &mut next);

            let mut flipped = 0usize;
            for id in &self.follow {
                let relay = &mut self.relays[id.index()];
                let level = self.energized[relay.coil_node.index()];
                if relay.driven != level {
                    relay.driven = level;
                    flipped += 1;
                }
            }
            event!(Level::TRACE, netlist = %self.name, pass, flipped, "settle pass");

            if flipped == 0 {
                self.scratch = next;
                self.dirty = false;
                return Ok(Settled { passes: pass });
            }
        }

        self.scratch = next;
        event!(
            Level::WARN,
            netlist = %self.name,
            passes = self.iteration_cap,
            "netlist does not settle"
        );
        Err(NetlistError::Oscillation {
            netlist: self.name.clone(),
            passes: self.iteration_cap,
        })
    }

    /// Settle only if inputs changed since the last settle.
    pub fn settle_if_dirty(&mut self) -> Result<Settled, NetlistError> {
        if self.dirty {
            self.settle()
        } else {
            Ok(Settled { passes: 0 })
        }
    }

    /// Latch every relay clocked on `phase` from its coil node, then settle.
    ///
    /// All relays of the phase sample the same settled state; none of them
    /// sees another one's new value.
    pub fn strobe(&mut self, clock: &PhaseClock, phase: Phase) -> Result<Settled, NetlistError> {
        if clock.active() != Some(phase) {
            return Err(NetlistError::PhaseViolation {
                netlist: self.name.clone(),
                requested: phase,
                active: clock.active(),
            });
        }
        self.settle_if_dirty()?;

        let mut changed = false;
        for id in &self.clocked[phase.index()] {
            let relay = &mut self.relays[id.index()];
            let level = self.energized[relay.coil_node.index()];
            if relay.driven != level {
                relay.driven = level;
                changed = true;
            }
        }

        if changed {
            self.settle()
        } else {
            Ok(Settled { passes: 0 })
        }
    }
}
