/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Events that the broker emits as it classifies rounds and routes messages.
//!
//! Library users can register handlers for each kind of event through the optional setters of
//! [`BrokerSpec`](crate::broker::BrokerSpec), e.g., `.on_drop_message(...)`. Handlers run on a
//! dedicated event bus thread, in the order the events were published.
//!
//! An event for a given action indicates that the action has been completed.

use std::{fmt, sync::mpsc::Sender, time::SystemTime};

use crate::{
    broker::Classification,
    types::{
        crypto_primitives::VerifyingKey,
        data_types::{CryptoHash, RoundNumber},
    },
};

pub enum Event {
    // Lifecycle events.
    RegisterRound(RegisterRoundEvent),
    UnregisterRound(UnregisterRoundEvent),
    ClassifyRound(ClassifyRoundEvent),
    // Routing events.
    BufferMessage(BufferMessageEvent),
    DeliverMessage(DeliverMessageEvent),
    DropMessage(DropMessageEvent),
}

impl Event {
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only goes away while the broker is being dropped.
            let _ = event_publisher.send(self);
        }
    }
}

/// A round was registered, and `flushed` buffered early messages were moved into its mailbox.
pub struct RegisterRoundEvent {
    pub timestamp: SystemTime,
    pub round: RoundNumber,
    pub flushed: usize,
}

pub struct UnregisterRoundEvent {
    pub timestamp: SystemTime,
    pub round: RoundNumber,
}

/// A round was classified for the first time. Emitted at most once per round, except that a later
/// unregistration emits no further `ClassifyRound` event.
pub struct ClassifyRoundEvent {
    pub timestamp: SystemTime,
    pub round: RoundNumber,
    pub classification: Classification,
}

/// An early message was appended to the pending buffer of its round, which now holds `buffered`
/// messages.
pub struct BufferMessageEvent {
    pub timestamp: SystemTime,
    pub round: RoundNumber,
    pub sender: VerifyingKey,
    pub message: CryptoHash,
    pub buffered: usize,
}

pub struct DeliverMessageEvent {
    pub timestamp: SystemTime,
    pub round: RoundNumber,
    pub sender: VerifyingKey,
    pub message: CryptoHash,
}

/// A gossip item was dropped without being delivered.
///
/// `round` is `None` if the item was dropped before its round could be read, and `message` is `None`
/// if it was dropped before it became a [`VerifiedMessage`](crate::validation::VerifiedMessage).
pub struct DropMessageEvent {
    pub timestamp: SystemTime,
    pub round: Option<RoundNumber>,
    pub message: Option<CryptoHash>,
    pub reason: DropReason,
}

/// Why a gossip item was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The item carried no bytes.
    EmptyPayload,
    /// The bytes are not a valid [`HareMessage`](crate::messages::HareMessage).
    Undecodable,
    MissingInnerMessage,
    /// The round was classified invalid because the node was not synchronized.
    RoundNotSynced,
    /// The round was unregistered.
    RoundUnregistered,
    /// The round has no mailbox, and is not the round right after `latest_round`.
    NotEarly { latest_round: RoundNumber },
    /// The message could not be turned into a [`VerifiedMessage`](crate::validation::VerifiedMessage).
    ConstructionFailed,
    RejectedByValidator,
    /// The pending buffer of the round is full.
    PendingBufferFull,
    /// The consumer of the round's mailbox has gone away.
    MailboxClosed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::EmptyPayload => write!(f, "EmptyPayload"),
            DropReason::Undecodable => write!(f, "Undecodable"),
            DropReason::MissingInnerMessage => write!(f, "MissingInnerMessage"),
            DropReason::RoundNotSynced => write!(f, "RoundNotSynced"),
            DropReason::RoundUnregistered => write!(f, "RoundUnregistered"),
            DropReason::NotEarly { latest_round } => write!(f, "NotEarly({})", latest_round),
            DropReason::ConstructionFailed => write!(f, "ConstructionFailed"),
            DropReason::RejectedByValidator => write!(f, "RejectedByValidator"),
            DropReason::PendingBufferFull => write!(f, "PendingBufferFull"),
            DropReason::MailboxClosed => write!(f, "MailboxClosed"),
        }
    }
}
