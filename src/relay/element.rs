//! The relay and its contacts.

use serde::{Deserialize, Serialize};

use super::clock::Phase;
use super::netlist::{NodeId, RelayId};

/// Contact polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Closes when the coil is driven ("Arbeitskontakt").
    NormallyOpen,
    /// Opens when the coil is driven ("Ruhekontakt").
    NormallyClosed,
}

impl Polarity {
    /// Conduction of a contact with this polarity for a given coil state.
    #[inline]
    pub const fn conducts(self, coil_driven: bool) -> bool {
        match self {
            Polarity::NormallyOpen => coil_driven,
            Polarity::NormallyClosed => !coil_driven,
        }
    }

    /// The opposite polarity.
    #[inline]
    pub const fn flip(self) -> Self {
        match self {
            Polarity::NormallyOpen => Polarity::NormallyClosed,
            Polarity::NormallyClosed => Polarity::NormallyOpen,
        }
    }
}

/// How a relay's coil is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drive {
    /// Unclocked: the coil tracks its coil node while the netlist settles.
    #[default]
    Follow,
    /// The coil samples its coil node only when its phase is strobed.
    Clocked(Phase),
}

/// A relay: one coil wired between a coil node and ground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub(crate) name: String,
    pub(crate) coil_node: NodeId,
    pub(crate) drive: Drive,
    pub(crate) driven: bool,
}

impl Relay {
    /// The relay's name within its netlist.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node feeding the coil.
    pub fn coil_node(&self) -> NodeId {
        self.coil_node
    }

    /// Drive discipline.
    pub fn drive(&self) -> Drive {
        self.drive
    }

    /// Current coil state.
    pub fn is_driven(&self) -> bool {
        self.driven
    }
}

/// A two-terminal switch operated by a relay.
///
/// A changeover ("Umschaltkontakt") is modeled as one normally-open and one
/// normally-closed contact sharing a pole node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub(crate) relay: RelayId,
    pub(crate) polarity: Polarity,
    pub(crate) ends: (NodeId, NodeId),
}

impl Contact {
    /// Relay operating this contact.
    pub fn relay(&self) -> RelayId {
        self.relay
    }

    /// Contact polarity.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The two nodes joined while the contact conducts.
    pub fn ends(&self) -> (NodeId, NodeId) {
        self.ends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_conduction() {
        assert!(Polarity::NormallyOpen.conducts(true));
        assert!(!Polarity::NormallyOpen.conducts(false));
        assert!(Polarity::NormallyClosed.conducts(false));
        assert!(!Polarity::NormallyClosed.conducts(true));
    }

    #[test]
    fn test_polarity_flip_involution() {
        for p in [Polarity::NormallyOpen, Polarity::NormallyClosed] {
            assert_eq!(p.flip().flip(), p);
            assert_ne!(p.flip(), p);
        }
    }
}
