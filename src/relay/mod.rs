//! Relay-level circuit simulation.
//!
//! This module provides the substrate every unit of the machine is wired from:
//! - [`Relay`] and [`Contact`] - the bistable element and its switches
//! - [`Netlist`] - a fixed wiring of relays, nodes and the power rail
//! - the settling engine ([`Netlist::settle`]) that relaxes a netlist to its
//!   steady state
//! - [`PhaseClock`] - the two-phase clock that stages coil changes

mod element;
pub mod netlist;
pub mod settle;
pub mod clock;
pub mod description;

pub use element::{Contact, Drive, Polarity, Relay};
pub use netlist::{
    BuildError, InputId, Netlist, NetlistBuilder, NetlistError, NetlistStats, NodeId, RelayId,
    RAIL,
};
pub use settle::Settled;
pub use clock::{ClockError, Phase, PhaseClock};
pub use description::{ContactSpec, RelaySpec, WiringDescription};

/// Default cap on relaxation passes per settle.
pub const DEFAULT_ITERATION_CAP: usize = 256;
