/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The per-round state of the broker: classifications, mailboxes, and pending buffers.
//!
//! All three maps, together with the latest registered round, live in a single [`RoundTable`]
//! that the broker guards with one reader/writer lock. Keeping them together makes the flush of
//! a pending buffer and the creation of the mailbox it is flushed into a single atomic step, as
//! seen by message handling threads.
//!
//! ## Classification
//!
//! A round starts out [`Unknown`](Classification::Unknown). The first time the broker needs to know
//! about it, it asks the [`SyncState`] once and caches the answer as `Valid` or `Invalid`. The
//! cached answer is never re-evaluated, even if the node's synchronization state changes later. The
//! only transition out of `Valid` is into `Invalid` on [unregistration](RoundTable::close), and
//! nothing ever leaves `Invalid`.

use std::{
    collections::{HashMap, VecDeque},
    sync::mpsc::{self, SyncSender},
};

use crate::{
    events::DropReason, types::data_types::RoundNumber, validation::SyncState,
    validation::VerifiedMessage,
};

use super::mailbox::Mailbox;

/// Whether messages for a round are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// The round has not been classified yet.
    Unknown,
    Valid,
    Invalid(Invalidity),
}

/// Why a round is [`Invalid`](Classification::Invalid). Both causes close the round for good, but
/// they are told apart in logs and [drop reasons](DropReason).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidity {
    /// The node was not synchronized when the round was first classified.
    NotSynced,
    Unregistered,
}

impl From<Invalidity> for DropReason {
    fn from(invalidity: Invalidity) -> Self {
        match invalidity {
            Invalidity::NotSynced => DropReason::RoundNotSynced,
            Invalidity::Unregistered => DropReason::RoundUnregistered,
        }
    }
}

/// What should happen to a message for a given round, judging only by the round.
pub(crate) enum Admission {
    /// The round is registered: send the message into this mailbox.
    Registered(SyncSender<VerifiedMessage>),
    /// The round is the next one to be registered: buffer the message.
    Early,
    Rejected(DropReason),
}

/// Where [`RoundTable::place_early`] put an early message.
pub(crate) enum Placement {
    /// Appended to the pending buffer, which now holds this many messages.
    Buffered(usize),
    /// The pending buffer is full. The message was dropped.
    Full,
    /// The round was registered after the message was admitted: send it into this mailbox instead.
    Registered(SyncSender<VerifiedMessage>, VerifiedMessage),
    Rejected(DropReason),
}

pub(crate) struct RoundTable {
    classifications: HashMap<RoundNumber, Classification>,
    mailboxes: HashMap<RoundNumber, SyncSender<VerifiedMessage>>,
    pending: HashMap<RoundNumber, VecDeque<VerifiedMessage>>,
    latest_round: RoundNumber,
}

impl RoundTable {
    pub(crate) fn new() -> RoundTable {
        RoundTable {
            classifications: HashMap::new(),
            mailboxes: HashMap::new(),
            pending: HashMap::new(),
            latest_round: RoundNumber::init(),
        }
    }

    pub(crate) fn latest_round(&self) -> RoundNumber {
        self.latest_round
    }

    /// Move the latest round forward to `round`. Returns `false`, leaving the latest round as it is,
    /// if `round` is not newer than it.
    pub(crate) fn update_latest_round(&mut self, round: RoundNumber) -> bool {
        if round <= self.latest_round {
            return false;
        }
        self.latest_round = round;
        true
    }

    pub(crate) fn classification(&self, round: RoundNumber) -> Classification {
        self.classifications
            .get(&round)
            .copied()
            .unwrap_or(Classification::Unknown)
    }

    /// Get the classification of `round`, computing and caching it first if it is unknown.
    ///
    /// The second return value is `true` if the classification was computed by this call, in which
    /// case `sync_state` was queried exactly once.
    pub(crate) fn classify(
        &mut self,
        round: RoundNumber,
        sync_state: &dyn SyncState,
    ) -> (Classification, bool) {
        match self.classification(round) {
            Classification::Unknown => (),
            cached => return (cached, false),
        }

        let classification = if sync_state.is_synced() {
            Classification::Valid
        } else {
            log::info!("Node is not synced. Marking round {} as invalid", round);
            Classification::Invalid(Invalidity::NotSynced)
        };
        self.classifications.insert(round, classification);
        (classification, true)
    }

    /// Decide what to do with a message for `round` from what is already known about the round.
    ///
    /// Returns `None` if the round is a candidate for early buffering but has not been classified
    /// yet. The caller then has to [`classify`](Self::classify) it, which requires write access.
    pub(crate) fn admit(&self, round: RoundNumber) -> Option<Admission> {
        let classification = self.classification(round);
        if let Classification::Invalid(invalidity) = classification {
            return Some(Admission::Rejected(invalidity.into()));
        }

        if let Some(mailbox) = self.mailboxes.get(&round) {
            return Some(Admission::Registered(mailbox.clone()));
        }

        if round != self.latest_round + 1 {
            return Some(Admission::Rejected(DropReason::NotEarly {
                latest_round: self.latest_round,
            }));
        }

        match classification {
            Classification::Valid => Some(Admission::Early),
            _ => None,
        }
    }

    /// Append an early `message` to the pending buffer of its round, creating the buffer if this is
    /// the first early message for the round.
    ///
    /// The round is admitted again first, since it may have been registered, unregistered, or left
    /// behind by the latest round after `message` was first admitted.
    pub(crate) fn place_early(&mut self, message: VerifiedMessage, capacity: usize) -> Placement {
        let round = message.round();
        match self.admit(round) {
            Some(Admission::Registered(mailbox)) => Placement::Registered(mailbox, message),
            Some(Admission::Rejected(reason)) => Placement::Rejected(reason),
            // Classifications are never removed, and this message's round was classified valid
            // before it got here, so `None` does not occur.
            Some(Admission::Early) | None => {
                let buffer = self.pending.entry(round).or_default();
                if buffer.len() >= capacity {
                    return Placement::Full;
                }
                buffer.push_back(message);
                Placement::Buffered(buffer.len())
            }
        }
    }

    /// Create a fresh mailbox for `round` with room for `capacity` messages, and move the round's
    /// pending buffer into it in arrival order. Returns the mailbox and the number of messages moved.
    ///
    /// A mailbox that was already open for `round` is replaced. Its consumer keeps whatever was
    /// delivered to it, but receives nothing more.
    pub(crate) fn open_mailbox(&mut self, round: RoundNumber, capacity: usize) -> (Mailbox, usize) {
        let (sender, receiver) = mpsc::sync_channel(capacity);

        let mut flushed = 0;
        if let Some(pending) = self.pending.remove(&round) {
            for message in pending {
                // The mailbox is fresh and at least as large as a full pending buffer.
                match sender.try_send(message) {
                    Ok(()) => flushed += 1,
                    Err(_) => {
                        log::error!(
                            "Mailbox for round {} overflowed while flushing its pending messages",
                            round
                        );
                        break;
                    }
                }
            }
        }

        self.mailboxes.insert(round, sender);
        (Mailbox::new(round, capacity, receiver), flushed)
    }

    /// Mark `round` as unregistered and forget its mailbox and pending buffer.
    ///
    /// The mailbox's consumer is not notified. Messages that handling threads were already sending
    /// into it may still arrive.
    pub(crate) fn close(&mut self, round: RoundNumber) {
        self.classifications
            .insert(round, Classification::Invalid(Invalidity::Unregistered));
        self.mailboxes.remove(&round);
        self.pending.remove(&round);
    }
}
