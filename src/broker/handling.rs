/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Handling of a single gossip item, from raw bytes to a mailbox or a pending buffer.
//!
//! Every item is handled on its own thread, in parallel with all other items and with calls to
//! [`register`](super::Broker::register) and [`unregister`](super::Broker::unregister). Handling goes
//! through these steps:
//! 1. Drop the item if it carries no bytes, cannot be decoded, or has no inner message.
//! 2. Under the read lock, decide from the message's round whether the message is for a
//!    registered round, is early (for the round right after the latest registered round), or has
//!    to be dropped. Only an unclassified early round makes this step take the write lock.
//! 3. With no lock held, turn the message into a [`VerifiedMessage`] and run the [`Validator`](crate::validation::Validator)
//!    on it. Report the outcome to the transport.
//! 4. Send the message into the round's mailbox, blocking if it is full, or append it to the round's
//!    pending buffer under the write lock.
//!
//! Every drop is final: it is logged, published as a [`DropMessageEvent`], and never retried.

use std::{
    sync::{mpsc::SyncSender, Arc},
    thread,
    time::SystemTime,
};

use crate::{
    events::{BufferMessageEvent, DeliverMessageEvent, DropMessageEvent, DropReason, Event},
    logging::first_seven_base64_chars,
    messages::HareMessage,
    networking::{GossipMessage, PROTOCOL_NAME},
    types::data_types::{CryptoHash, RoundNumber},
    validation::VerifiedMessage,
};

use super::{
    rounds::{Admission, Classification, Placement},
    BrokerCore,
};

/// Handle `item` on a new thread. The thread is not tracked, and runs to completion even if the
/// broker is shut down in the meantime.
pub(crate) fn spawn_handler<M: GossipMessage>(core: Arc<BrokerCore>, item: M) {
    let spawned = thread::Builder::new()
        .name(String::from("hare-handler"))
        .spawn(move || core.handle(item));

    if let Err(err) = spawned {
        log::error!(
            "Could not spawn a message handling thread, dropping message: {}",
            err
        );
    }
}

impl BrokerCore {
    pub(crate) fn handle<M: GossipMessage>(&self, item: M) {
        if item.bytes().is_empty() {
            log::error!("Message validation failed: called with an empty payload");
            self.dropped(None, None, DropReason::EmptyPayload);
            return;
        }

        let message = match HareMessage::from_bytes(item.bytes()) {
            Ok(message) => message,
            Err(err) => {
                log::error!("Could not build message: {}", err);
                self.dropped(None, None, DropReason::Undecodable);
                return;
            }
        };

        let round = match message.round() {
            Some(round) => round,
            None => {
                log::warn!("Message validation failed: inner message is missing");
                self.dropped(None, None, DropReason::MissingInnerMessage);
                return;
            }
        };

        // `None` if the message is early.
        let mailbox = match self.admit(round) {
            Admission::Registered(mailbox) => Some(mailbox),
            Admission::Early => None,
            Admission::Rejected(reason) => {
                log_ignored(round, reason);
                self.dropped(Some(round), None, reason);
                return;
            }
        };

        let message =
            match VerifiedMessage::new(message, self.state_querier.as_ref(), self.layers_per_epoch) {
                Ok(message) => message,
                Err(err) => {
                    log::warn!(
                        "Message validation failed: could not construct message for round {}: {}",
                        round,
                        err
                    );
                    self.dropped(Some(round), None, DropReason::ConstructionFailed);
                    return;
                }
            };

        if !self.validator.validate(&message) {
            log::warn!(
                "Message validation failed: validator rejected message {} for round {}",
                first_seven_base64_chars(&message.digest().bytes()),
                round
            );
            item.report_validation(PROTOCOL_NAME, false);
            self.dropped(
                Some(round),
                Some(message.digest()),
                DropReason::RejectedByValidator,
            );
            return;
        }

        // Validation passed: let the transport relay the item.
        item.report_validation(PROTOCOL_NAME, true);

        match mailbox {
            Some(mailbox) => self.deliver(mailbox, message),
            None => self.buffer(message),
        }
    }

    /// Decide what to do with a message for `round`, classifying the round if it is an early round
    /// that has not been classified yet.
    fn admit(&self, round: RoundNumber) -> Admission {
        if let Some(admission) = self.read_rounds().admit(round) {
            return admission;
        }

        let mut rounds = self.write_rounds();
        // Another thread may have classified or registered the round between the two locks.
        if let Some(admission) = rounds.admit(round) {
            return admission;
        }

        match self.classify(&mut rounds, round) {
            Classification::Valid => Admission::Early,
            _ => Admission::Rejected(DropReason::RoundNotSynced),
        }
    }

    /// Send `message` into `mailbox`, blocking while it is full.
    fn deliver(&self, mailbox: SyncSender<VerifiedMessage>, message: VerifiedMessage) {
        let round = message.round();
        let sender = *message.sender();
        let digest = message.digest();

        if mailbox.send(message).is_err() {
            log::debug!(
                "Ignoring message because the mailbox of round {} has been dropped",
                round
            );
            self.dropped(Some(round), Some(digest), DropReason::MailboxClosed);
            return;
        }

        Event::DeliverMessage(DeliverMessageEvent {
            timestamp: SystemTime::now(),
            round,
            sender,
            message: digest,
        })
        .publish(&self.event_publisher);
    }

    /// Append an early `message` to the pending buffer of its round.
    fn buffer(&self, message: VerifiedMessage) {
        let round = message.round();
        let sender = *message.sender();
        let digest = message.digest();

        let mut rounds = self.write_rounds();
        let placement = rounds.place_early(message, self.pending_buffer_capacity);
        match placement {
            Placement::Buffered(buffered) => {
                // Published under the lock, so that buffer events come out in buffer order.
                Event::BufferMessage(BufferMessageEvent {
                    timestamp: SystemTime::now(),
                    round,
                    sender,
                    message: digest,
                    buffered,
                })
                .publish(&self.event_publisher);
            }
            Placement::Full => {
                drop(rounds);
                log::error!(
                    "Reached {} pending messages. Ignoring message for round {} sent from {}",
                    self.pending_buffer_capacity,
                    round,
                    first_seven_base64_chars(&sender.to_bytes())
                );
                self.dropped(Some(round), Some(digest), DropReason::PendingBufferFull);
            }
            Placement::Registered(mailbox, message) => {
                drop(rounds);
                self.deliver(mailbox, message);
            }
            Placement::Rejected(reason) => {
                drop(rounds);
                log_ignored(round, reason);
                self.dropped(Some(round), Some(digest), reason);
            }
        }
    }

    fn dropped(&self, round: Option<RoundNumber>, message: Option<CryptoHash>, reason: DropReason) {
        Event::DropMessage(DropMessageEvent {
            timestamp: SystemTime::now(),
            round,
            message,
            reason,
        })
        .publish(&self.event_publisher);
    }
}

fn log_ignored(round: RoundNumber, reason: DropReason) {
    match reason {
        DropReason::RoundNotSynced => log::debug!(
            "Ignoring message because round {} is out of sync",
            round
        ),
        DropReason::RoundUnregistered => log::debug!(
            "Ignoring message because round {} has already been unregistered",
            round
        ),
        DropReason::NotEarly { latest_round } => log::warn!(
            "Message validation failed: message for unregistered round {} is not an early message (latest round: {})",
            round,
            latest_round
        ),
        other => log::debug!("Ignoring message for round {}: {}", round, other),
    }
}
