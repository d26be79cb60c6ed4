/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable checks that a message has to pass before the broker routes it.
//!
//! A decoded [`HareMessage`] goes through two stages of checks:
//! 1. [`VerifiedMessage::new`] checks what every Hare message must satisfy regardless of its
//!    content: that it is complete, that its signature is correct, and that its sender is an active
//!    identity in the epoch of the message's round, according to the library user's [`StateQuerier`].
//! 2. The library user's [`Validator`] then applies protocol-specific checks, e.g., role eligibility.
//!
//! Both stages run outside of the broker's internal lock, so they are allowed to be slow.

use std::fmt;

use thiserror::Error;

use crate::messages::{HareMessage, InnerMessage};
use crate::types::{
    crypto_primitives::{CryptoHasher, Digest, Signature, Verifier, VerifyingKey},
    data_types::{CryptoHash, EpochLength, EpochNumber, RoundNumber, SignatureBytes},
};

/// Protocol-specific acceptance check, applied after a message has been turned into a
/// [`VerifiedMessage`].
///
/// Returning `false` makes the broker report negative validation to the transport and drop the message.
pub trait Validator: Send + Sync {
    fn validate(&self, message: &VerifiedMessage) -> bool;
}

/// Read access to the set of identities that are allowed to take part in Hare.
pub trait StateQuerier: Send + Sync {
    /// Check whether `identity` is an active identity in `epoch`.
    fn is_identity_active(
        &self,
        identity: &VerifyingKey,
        epoch: EpochNumber,
    ) -> Result<bool, StateQueryError>;
}

/// Whether the local node currently considers itself caught up with the network.
///
/// The broker queries this at most once per round. Any `Fn() -> bool` closure can be used.
pub trait SyncState: Send + Sync {
    fn is_synced(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync> SyncState for F {
    fn is_synced(&self) -> bool {
        self()
    }
}

/// A [`HareMessage`] that is complete, correctly signed, and was sent by an active identity.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedMessage {
    sender: VerifyingKey,
    signature: SignatureBytes,
    inner: InnerMessage,
    digest: CryptoHash,
}

impl VerifiedMessage {
    /// Check `message` and, if it passes, wrap it into a `VerifiedMessage`.
    ///
    /// The sender's activity is looked up in the epoch that the message's round falls into, given
    /// that every epoch is `epoch_length` rounds long.
    pub fn new(
        message: HareMessage,
        state_querier: &dyn StateQuerier,
        epoch_length: EpochLength,
    ) -> Result<VerifiedMessage, MessageConstructionError> {
        let inner = message
            .inner
            .ok_or(MessageConstructionError::MissingInnerMessage)?;

        let sender = VerifyingKey::from_bytes(&message.sender.bytes())
            .map_err(|_| MessageConstructionError::InvalidSenderKey)?;

        let signing_bytes = inner.signing_bytes();
        let signature = Signature::from_bytes(&message.signature.bytes());
        if sender.verify(&signing_bytes, &signature).is_err() {
            return Err(MessageConstructionError::InvalidSignature);
        }

        let epoch = inner.round.epoch(epoch_length);
        if !state_querier.is_identity_active(&sender, epoch)? {
            return Err(MessageConstructionError::InactiveIdentity { epoch });
        }

        let mut hasher = CryptoHasher::new();
        hasher.update(sender.as_bytes());
        hasher.update(&signing_bytes);
        let digest = CryptoHash::new(hasher.finalize().into());

        Ok(VerifiedMessage {
            sender,
            signature: message.signature,
            inner,
            digest,
        })
    }

    pub fn round(&self) -> RoundNumber {
        self.inner.round
    }

    pub fn sender(&self) -> &VerifyingKey {
        &self.sender
    }

    pub fn signature(&self) -> SignatureBytes {
        self.signature
    }

    pub fn inner(&self) -> &InnerMessage {
        &self.inner
    }

    /// Get the SHA256 hash of the sender's key and the signed bytes. Identifies the message in logs
    /// and [events](crate::events).
    pub fn digest(&self) -> CryptoHash {
        self.digest
    }
}

impl fmt::Debug for VerifiedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedMessage")
            .field("sender", &self.sender.as_bytes())
            .field("inner", &self.inner)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Reasons why [`VerifiedMessage::new`] can reject a message.
#[derive(Debug, Error)]
pub enum MessageConstructionError {
    #[error("message has no inner message")]
    MissingInnerMessage,
    #[error("sender is not a valid ed25519 public key")]
    InvalidSenderKey,
    #[error("signature does not match the inner message")]
    InvalidSignature,
    #[error("sender is not an active identity in epoch {epoch}")]
    InactiveIdentity { epoch: EpochNumber },
    #[error("could not query identity state: {0}")]
    StateQuery(#[from] StateQueryError),
}

/// Returned by a [`StateQuerier`] that cannot answer.
#[derive(Debug, Error)]
pub enum StateQueryError {
    #[error("no identity data for epoch {0}")]
    UnknownEpoch(EpochNumber),
    #[error("identity state unavailable: {0}")]
    Unavailable(String),
}
