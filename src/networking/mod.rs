//! Pluggable gossip networking, and the thread that reads from it.
//!
//! The broker does not implement a transport. Library users plug one in by implementing
//! [`GossipNetwork`], and the broker then reads the gossip items of [`PROTOCOL_NAME`] on a single
//! dispatch thread (see [`receiving`]).

pub mod network;
pub use network::{GossipMessage, GossipNetwork, PROTOCOL_NAME};

pub(crate) mod receiving;
