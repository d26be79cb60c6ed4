use std::{
    sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError},
    time::Duration,
};

use crate::{types::data_types::RoundNumber, validation::VerifiedMessage};

/// The receiving end of the bounded queue that a registered round's consensus instance reads its
/// messages from.
///
/// Returned by [`Broker::register`](crate::broker::Broker::register). Messages arrive in the order
/// they were buffered (for early messages) or sent (for everything after registration). When the
/// mailbox is full, the threads delivering into it block until the consumer catches up.
#[derive(Debug)]
pub struct Mailbox {
    round: RoundNumber,
    capacity: usize,
    receiver: Receiver<VerifiedMessage>,
}

impl Mailbox {
    pub(crate) fn new(
        round: RoundNumber,
        capacity: usize,
        receiver: Receiver<VerifiedMessage>,
    ) -> Mailbox {
        Mailbox {
            round,
            capacity,
            receiver,
        }
    }

    /// The round this mailbox was registered for. Every message received from it targets this round.
    pub fn round(&self) -> RoundNumber {
        self.round
    }

    /// The maximum number of messages the mailbox holds before deliveries block.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a message arrives. Fails once the round is unregistered (or registered again) and
    /// every in-flight delivery has completed.
    pub fn recv(&self) -> Result<VerifiedMessage, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<VerifiedMessage, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<VerifiedMessage, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
