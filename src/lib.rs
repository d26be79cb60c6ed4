/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A message broker for the Hare Byzantine agreement protocol.
//!
//! A node runs one Hare consensus instance per ledger round ("layer"), and many of these instances
//! may be alive at the same time. All of them share a single gossip protocol, so every inbound
//! message has to be routed to the instance that it belongs to. The [`Broker`](broker::Broker)
//! does this routing:
//! 1. It reads raw gossip items from the [network](networking) on a single dispatch thread,
//! 2. Decodes, checks, and [validates](validation) each item on its own short-lived thread,
//! 3. Delivers the item into the [`Mailbox`](broker::Mailbox) of the round it targets, or buffers
//!    it if it arrived just before its round was registered.
//!
//! Rounds are classified once, on first need, as valid or invalid depending on whether the node
//! was synchronized with the network at that moment. That classification never changes
//! afterwards, except that unregistering a round closes it for good.
//!
//! Library users plug in the transport, the synchronization predicate, the identity lookup, and
//! the protocol-specific validator, and drive the lifecycle through
//! [`start`](broker::Broker::start), [`register`](broker::Broker::register), and
//! [`unregister`](broker::Broker::unregister).

pub mod broker;

pub mod closer;

pub mod events;

pub(crate) mod event_bus;

pub(crate) mod logging;

pub mod messages;

pub mod networking;

pub mod types;

pub mod validation;
