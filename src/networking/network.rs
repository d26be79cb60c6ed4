/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::sync::mpsc::Receiver;

/// Name of the gossip protocol that Hare messages travel on.
pub const PROTOCOL_NAME: &str = "HARE_PROTOCOL";

/// A gossip transport that delivers the messages of a named protocol on a channel.
pub trait GossipNetwork: Clone + Send + 'static {
    type Message: GossipMessage;

    /// Subscribe to the gossip messages of `protocol`, returning the channel they will arrive on.
    ///
    /// The broker calls this exactly once, when it is [started](crate::broker::Broker::start).
    fn register_gossip_protocol(&mut self, protocol: &'static str) -> Receiver<Self::Message>;
}

/// A single item received through gossip.
pub trait GossipMessage: Send + 'static {
    /// The raw bytes of the item. An empty slice stands for an absent payload.
    fn bytes(&self) -> &[u8];

    /// Tell the transport whether the item passed validation. The transport uses this to decide
    /// whether to relay the item, and to score the peer that sent it.
    fn report_validation(&self, protocol: &str, is_valid: bool);
}
