//! Netlist construction and the settled-state API.
//!
//! A netlist is built once with [`NetlistBuilder`] and then driven, settled,
//! strobed and read for the lifetime of the unit it models. Wiring is frozen
//! at build time; only coil states and driven inputs change afterwards.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::clock::Phase;
use super::element::{Contact, Drive, Polarity, Relay};

/// A wiring point inside one netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A relay inside one netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelayId(pub(crate) u32);

impl RelayId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named, externally driven input node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputId(pub(crate) usize);

/// The power rail. Always energized; node 0 of every netlist.
pub const RAIL: NodeId = NodeId(0);

/// Conductive element between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    Contact(usize),
    Wire,
}

/// Errors raised while freezing a netlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("netlist {netlist}: contact {contact} references relay #{relay} which does not exist")]
    DanglingContact {
        netlist: String,
        contact: usize,
        relay: u32,
    },

    #[error("netlist {netlist}: node {node} has no path to the rail or an input")]
    IsolatedNode { netlist: String, node: String },

    #[error("netlist {netlist}: node #{node} does not exist")]
    UnknownNode { netlist: String, node: u32 },

    #[error("netlist {netlist}: duplicate {kind} name '{name}'")]
    DuplicateName {
        netlist: String,
        kind: &'static str,
        name: String,
    },

    #[error("netlist {netlist}: unknown {kind} '{name}'")]
    UnknownName {
        netlist: String,
        kind: &'static str,
        name: String,
    },

    #[error("netlist {netlist} does not reach a steady state after {passes} passes")]
    Unstable { netlist: String, passes: usize },
}

/// Errors raised while operating a built netlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetlistError {
    #[error("netlist {netlist} oscillates: no steady state after {passes} passes")]
    Oscillation { netlist: String, passes: usize },

    #[error("netlist {netlist}: phase {requested:?} strobed while {active:?} is active")]
    PhaseViolation {
        netlist: String,
        requested: Phase,
        active: Option<Phase>,
    },

    #[error("netlist {netlist}: unknown {kind} '{name}'")]
    UnknownPort {
        netlist: String,
        kind: &'static str,
        name: String,
    },
}

impl NetlistError {
    /// Name of the netlist that raised the error.
    pub fn netlist(&self) -> &str {
        match self {
            NetlistError::Oscillation { netlist, .. }
            | NetlistError::PhaseViolation { netlist, .. }
            | NetlistError::UnknownPort { netlist, .. } => netlist,
        }
    }
}

/// Element counts of a built netlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetlistStats {
    pub relays: usize,
    pub clocked: usize,
    pub contacts: usize,
    pub wires: usize,
    pub nodes: usize,
    pub inputs: usize,
    pub outputs: usize,
}

impl std::ops::Add for NetlistStats {
    type Output = NetlistStats;

    fn add(self, rhs: NetlistStats) -> NetlistStats {
        NetlistStats {
            relays: self.relays + rhs.relays,
            clocked: self.clocked + rhs.clocked,
            contacts: self.contacts + rhs.contacts,
            wires: self.wires + rhs.wires,
            nodes: self.nodes + rhs.nodes,
            inputs: self.inputs + rhs.inputs,
            outputs: self.outputs + rhs.outputs,
        }
    }
}

impl std::iter::Sum for NetlistStats {
    fn sum<I: Iterator<Item = NetlistStats>>(iter: I) -> NetlistStats {
        iter.fold(NetlistStats::default(), |acc, s| acc + s)
    }
}

/// Incremental wiring of a netlist.
pub struct NetlistBuilder {
    name: String,
    node_names: Vec<Option<String>>,
    relays: Vec<Relay>,
    contacts: Vec<Contact>,
    wires: Vec<(NodeId, NodeId)>,
    inputs: Vec<(String, NodeId)>,
    outputs: Vec<(String, NodeId)>,
}

impl NetlistBuilder {
    /// Start a netlist containing only the power rail.
    pub fn new(name: impl Into<String>) -> Self {
        NetlistBuilder {
            name: name.into(),
            node_names: vec![Some("+".to_string())],
            relays: Vec::new(),
            contacts: Vec::new(),
            wires: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Name of the netlist under construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an anonymous wiring node.
    pub fn node(&mut self) -> NodeId {
        self.node_names.push(None);
        NodeId(self.node_names.len() as u32 - 1)
    }

    /// Add a named wiring node.
    pub fn named_node(&mut self, name: impl Into<String>) -> NodeId {
        self.node_names.push(Some(name.into()));
        NodeId(self.node_names.len() as u32 - 1)
    }

    /// Add an externally driven input node.
    pub fn input(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let node = self.named_node(name.clone());
        self.inputs.push((name, node));
        node
    }

    /// Expose a node as a named output.
    pub fn output(&mut self, name: impl Into<String>, node: NodeId) {
        self.outputs.push((name.into(), node));
    }

    /// Add a relay whose coil hangs on `coil`.
    pub fn relay(&mut self, name: impl Into<String>, coil: NodeId, drive: Drive) -> RelayId {
        self.relays.push(Relay {
            name: name.into(),
            coil_node: coil,
            drive,
            driven: false,
        });
        RelayId(self.relays.len() as u32 - 1)
    }

    /// Add a contact of `relay` between nodes `a` and `b`.
    pub fn contact(&mut self, relay: RelayId, polarity: Polarity, a: NodeId, b: NodeId) {
        self.contacts.push(Contact {
            relay,
            polarity,
            ends: (a, b),
        });
    }

    /// Add a changeover contact on `pole`. Returns the (make, break) sides.
    pub fn changeover(&mut self, relay: RelayId, pole: NodeId) -> (NodeId, NodeId) {
        let make = self.node();
        let brk = self.node();
        self.contact(relay, Polarity::NormallyOpen, pole, make);
        self.contact(relay, Polarity::NormallyClosed, pole, brk);
        (make, brk)
    }

    /// Join two nodes permanently.
    pub fn wire(&mut self, a: NodeId, b: NodeId) {
        self.wires.push((a, b));
    }

    /// Number of relays added so far.
    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    fn node_label(&self, node: NodeId) -> String {
        match self.node_names.get(node.index()).and_then(|n| n.as_ref()) {
            Some(name) => name.clone(),
            None => format!("#{}", node.0),
        }
    }

    fn check_node(&self, node: NodeId) -> Result<(), BuildError> {
        if node.index() < self.node_names.len() {
            Ok(())
        } else {
            Err(BuildError::UnknownNode {
                netlist: self.name.clone(),
                node: node.0,
            })
        }
    }

    fn check_unique<'a>(
        &self,
        kind: &'static str,
        names: impl Iterator<Item = &'a str>,
    ) -> Result<(), BuildError> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(BuildError::DuplicateName {
                    netlist: self.name.clone(),
                    kind,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Freeze the wiring.
    ///
    /// The returned netlist has all coils undriven and has not been settled.
    pub fn build(self, iteration_cap: usize) -> Result<Netlist, BuildError> {
        for (i, contact) in self.contacts.iter().enumerate() {
            if contact.relay.index() >= self.relays.len() {
                return Err(BuildError::DanglingContact {
                    netlist: self.name.clone(),
                    contact: i,
                    relay: contact.relay.0,
                });
            }
            self.check_node(contact.ends.0)?;
            self.check_node(contact.ends.1)?;
        }
        for relay in &self.relays {
            self.check_node(relay.coil_node)?;
        }
        for &(a, b) in &self.wires {
            self.check_node(a)?;
            self.check_node(b)?;
        }
        for (_, node) in &self.outputs {
            self.check_node(*node)?;
        }
        self.check_unique("relay", self.relays.iter().map(|r| r.name.as_str()))?;
        self.check_unique("input", self.inputs.iter().map(|(n, _)| n.as_str()))?;
        self.check_unique("output", self.outputs.iter().map(|(n, _)| n.as_str()))?;

        let node_count = self.node_names.len();
        let mut adjacency: Vec<Vec<(Link, NodeId)>> = vec![Vec::new(); node_count];
        for (i, contact) in self.contacts.iter().enumerate() {
            let (a, b) = contact.ends;
            adjacency[a.index()].push((Link::Contact(i), b));
            adjacency[b.index()].push((Link::Contact(i), a));
        }
        for &(a, b) in &self.wires {
            adjacency[a.index()].push((Link::Wire, b));
            adjacency[b.index()].push((Link::Wire, a));
        }

        // With every contact closed, each node must hang off some source.
        let mut reached = vec![false; node_count];
        let mut queue = VecDeque::new();
        reached[RAIL.index()] = true;
        queue.push_back(RAIL);
        for (_, node) in &self.inputs {
            if !reached[node.index()] {
                reached[node.index()] = true;
                queue.push_back(*node);
            }
        }
        while let Some(node) = queue.pop_front() {
            for &(_, next) in &adjacency[node.index()] {
                if !reached[next.index()] {
                    reached[next.index()] = true;
                    queue.push_back(next);
                }
            }
        }
        if let Some(i) = reached.iter().position(|r| !r) {
            return Err(BuildError::IsolatedNode {
                netlist: self.name.clone(),
                node: self.node_label(NodeId(i as u32)),
            });
        }

        let mut follow = Vec::new();
        let mut clocked: [Vec<RelayId>; 2] = [Vec::new(), Vec::new()];
        for (i, relay) in self.relays.iter().enumerate() {
            match relay.drive {
                Drive::Follow => follow.push(RelayId(i as u32)),
                Drive::Clocked(phase) => clocked[phase.index()].push(RelayId(i as u32)),
            }
        }

        let input_count = self.inputs.len();
        Ok(Netlist {
            name: self.name,
            relays: self.relays,
            contacts: self.contacts,
            wire_count: self.wires.len(),
            adjacency,
            inputs: self.inputs,
            outputs: self.outputs,
            driven: vec![false; input_count],
            energized: vec![false; node_count],
            scratch: Vec::with_capacity(node_count),
            follow,
            clocked,
            iteration_cap,
            dirty: true,
        })
    }
}

/// A frozen relay netlist with its current coil and node states.
pub struct Netlist {
    pub(crate) name: String,
    pub(crate) relays: Vec<Relay>,
    pub(crate) contacts: Vec<Contact>,
    pub(crate) wire_count: usize,
    pub(crate) adjacency: Vec<Vec<(Link, NodeId)>>,
    pub(crate) inputs: Vec<(String, NodeId)>,
    pub(crate) outputs: Vec<(String, NodeId)>,
    pub(crate) driven: Vec<bool>,
    pub(crate) energized: Vec<bool>,
    pub(crate) scratch: Vec<bool>,
    pub(crate) follow: Vec<RelayId>,
    pub(crate) clocked: [Vec<RelayId>; 2],
    pub(crate) iteration_cap: usize,
    pub(crate) dirty: bool,
}

impl Netlist {
    /// Netlist name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve an input by name.
    pub fn input(&self, name: &str) -> Result<InputId, NetlistError> {
        self.inputs
            .iter()
            .position(|(n, _)| n == name)
            .map(InputId)
            .ok_or_else(|| self.unknown("input", name))
    }

    /// Resolve a numbered input bank `prefix0 .. prefix{width-1}`.
    pub fn input_bank(&self, prefix: &str, width: usize) -> Result<Vec<InputId>, NetlistError> {
        (0..width).map(|i| self.input(&format!("{prefix}{i}"))).collect()
    }

    /// Resolve an output by name.
    pub fn output(&self, name: &str) -> Result<NodeId, NetlistError> {
        self.find_output(name)
            .ok_or_else(|| self.unknown("output", name))
    }

    /// Resolve an output by name, if the netlist has one.
    pub fn find_output(&self, name: &str) -> Option<NodeId> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| *node)
    }

    /// Resolve a numbered output bank `prefix0 .. prefix{width-1}`.
    pub fn output_bank(&self, prefix: &str, width: usize) -> Result<Vec<NodeId>, NetlistError> {
        (0..width).map(|i| self.output(&format!("{prefix}{i}"))).collect()
    }

    fn unknown(&self, kind: &'static str, name: &str) -> NetlistError {
        NetlistError::UnknownPort {
            netlist: self.name.clone(),
            kind,
            name: name.to_string(),
        }
    }

    /// Drive an input high or low. Takes effect at the next settle.
    pub fn drive(&mut self, input: InputId, energized: bool) {
        if self.driven[input.0] != energized {
            self.driven[input.0] = energized;
            self.dirty = true;
        }
    }

    /// Drive a bank of inputs from the low bits of `bits`, least significant first.
    pub fn drive_word(&mut self, inputs: &[InputId], bits: u32) {
        for (i, input) in inputs.iter().enumerate() {
            self.drive(*input, (bits >> i) & 1 == 1);
        }
    }

    /// Drive inputs by name.
    pub fn drive_named<'a>(
        &mut self,
        levels: impl IntoIterator<Item = (&'a str, bool)>,
    ) -> Result<(), NetlistError> {
        for (name, level) in levels {
            let input = self.input(name)?;
            self.drive(input, level);
        }
        Ok(())
    }

    /// Whether an input is currently driven high.
    pub fn is_driven(&self, input: InputId) -> bool {
        self.driven[input.0]
    }

    /// Energization of a node as of the last settle.
    #[inline]
    pub fn read(&self, node: NodeId) -> bool {
        self.energized[node.index()]
    }

    /// Read a bank of nodes into the low bits of a word, least significant first.
    pub fn read_word(&self, nodes: &[NodeId]) -> u32 {
        nodes
            .iter()
            .enumerate()
            .fold(0, |acc, (i, node)| acc | (u32::from(self.read(*node)) << i))
    }

    /// Read an output by name.
    pub fn read_named(&self, name: &str) -> Result<bool, NetlistError> {
        Ok(self.read(self.output(name)?))
    }

    /// Whether inputs changed since the last settle.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Look up a relay by name.
    pub fn relay_id(&self, name: &str) -> Option<RelayId> {
        self.relays
            .iter()
            .position(|r| r.name == name)
            .map(|i| RelayId(i as u32))
    }

    /// A relay of this netlist.
    pub fn relay(&self, id: RelayId) -> &Relay {
        &self.relays[id.index()]
    }

    /// Coil state of a relay.
    pub fn coil(&self, id: RelayId) -> bool {
        self.relays[id.index()].driven
    }

    /// All output names with their current levels.
    pub fn output_levels(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.outputs
            .iter()
            .map(|(name, node)| (name.as_str(), self.read(*node)))
    }

    /// Element counts.
    pub fn stats(&self) -> NetlistStats {
        NetlistStats {
            relays: self.relays.len(),
            clocked: self.clocked[0].len() + self.clocked[1].len(),
            contacts: self.contacts.len(),
            wires: self.wire_count,
            nodes: self.energized.len(),
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
        }
    }
}

impl fmt::Debug for Netlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels: HashMap<&str, bool> = self.output_levels().collect();
        f.debug_struct("Netlist")
            .field("name", &self.name)
            .field("stats", &self.stats())
            .field("outputs", &levels)
            .finish()
    }
}
