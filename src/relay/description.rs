//! Declarative wiring descriptions.
//!
//! A [`WiringDescription`] names every node and relay, so small netlists can
//! be written as JSON and built without code:
//!
//! ```json
//! {
//!   "name": "inverter",
//!   "inputs": ["a"],
//!   "outputs": ["q"],
//!   "relays": [{ "name": "K", "coil": "a" }],
//!   "contacts": [{ "relay": "K", "polarity": "normally_closed", "between": ["+", "q"] }]
//! }
//! ```
//!
//! The node named `+` is the power rail.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::element::{Drive, Polarity};
use super::netlist::{BuildError, Netlist, NetlistBuilder, NodeId, RelayId, RAIL};

/// A relay entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySpec {
    pub name: String,
    /// Node feeding the coil.
    pub coil: String,
    #[serde(default)]
    pub drive: Drive,
}

/// A contact entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSpec {
    pub relay: String,
    pub polarity: Polarity,
    pub between: [String; 2],
}

/// A complete netlist in named form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WiringDescription {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub relays: Vec<RelaySpec>,
    #[serde(default)]
    pub contacts: Vec<ContactSpec>,
    #[serde(default)]
    pub wires: Vec<[String; 2]>,
}

impl WiringDescription {
    /// Parse a description from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build the described netlist.
    pub fn build(&self, iteration_cap: usize) -> Result<Netlist, BuildError> {
        let mut builder = NetlistBuilder::new(self.name.clone());
        let mut nodes: HashMap<&str, NodeId> = HashMap::new();
        nodes.insert("+", RAIL);

        for input in &self.inputs {
            if nodes.contains_key(input.as_str()) {
                return Err(BuildError::DuplicateName {
                    netlist: self.name.clone(),
                    kind: "input",
                    name: input.clone(),
                });
            }
            nodes.insert(input, builder.input(input.clone()));
        }

        let mut relays: HashMap<&str, RelayId> = HashMap::new();
        for relay in &self.relays {
            let coil = resolve(&mut builder, &mut nodes, &relay.coil);
            let id = builder.relay(relay.name.clone(), coil, relay.drive);
            if relays.insert(relay.name.as_str(), id).is_some() {
                return Err(BuildError::DuplicateName {
                    netlist: self.name.clone(),
                    kind: "relay",
                    name: relay.name.clone(),
                });
            }
        }

        for contact in &self.contacts {
            let relay = relays.get(contact.relay.as_str()).copied().ok_or_else(|| {
                BuildError::UnknownName {
                    netlist: self.name.clone(),
                    kind: "relay",
                    name: contact.relay.clone(),
                }
            })?;
            let a = resolve(&mut builder, &mut nodes, &contact.between[0]);
            let b = resolve(&mut builder, &mut nodes, &contact.between[1]);
            builder.contact(relay, contact.polarity, a, b);
        }

        for [a, b] in &self.wires {
            let a = resolve(&mut builder, &mut nodes, a);
            let b = resolve(&mut builder, &mut nodes, b);
            builder.wire(a, b);
        }

        for output in &self.outputs {
            let node = nodes.get(output.as_str()).copied().ok_or_else(|| {
                BuildError::UnknownName {
                    netlist: self.name.clone(),
                    kind: "output node",
                    name: output.clone(),
                }
            })?;
            builder.output(output.clone(), node);
        }

        builder.build(iteration_cap)
    }
}

fn resolve<'a>(
    builder: &mut NetlistBuilder,
    nodes: &mut HashMap<&'a str, NodeId>,
    name: &'a str,
) -> NodeId {
    *nodes
        .entry(name)
        .or_insert_with(|| builder.named_node(name.to_string()))
}
