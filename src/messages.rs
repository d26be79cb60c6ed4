/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Structured messages that Hare instances gossip to each other, and their wire encoding.
//!
//! Every message travels inside a [`HareMessage`] envelope, which carries the sender's public key,
//! the sender's signature, and the protocol-specific [`InnerMessage`]. Envelopes are encoded with
//! [borsh](https://docs.rs/borsh/latest/borsh/).
//!
//! The broker only looks at two things in a decoded envelope: whether the inner message is present,
//! and which [round](InnerMessage::round) it targets. Everything else is checked when the envelope
//! is turned into a [`VerifiedMessage`](crate::validation::VerifiedMessage), or by the pluggable
//! [`Validator`](crate::validation::Validator).

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

use crate::types::{
    crypto_primitives::Keypair,
    data_types::{RoundNumber, SignatureBytes, ValueId, VerifyingKeyBytes},
};

/// The signed envelope in which every Hare message is gossiped.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct HareMessage {
    pub sender: VerifyingKeyBytes,
    pub signature: SignatureBytes,
    /// `None` for a structurally incomplete message. Such messages are dropped by the broker.
    pub inner: Option<InnerMessage>,
}

impl HareMessage {
    /// Create an envelope around `inner`, signed by `me`.
    pub fn new(me: &Keypair, inner: InnerMessage) -> HareMessage {
        let signature = me.sign(&inner.signing_bytes());
        HareMessage {
            sender: me.public_bytes(),
            signature,
            inner: Some(inner),
        }
    }

    /// Decode an envelope from its borsh encoding. Fails if `bytes` is truncated, malformed, or has
    /// trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<HareMessage, DecodeError> {
        Ok(HareMessage::try_from_slice(bytes)?)
    }

    /// Get the borsh encoding of this envelope.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Safety: serializing into a Vec cannot fail.
        self.try_to_vec().unwrap()
    }

    /// Get the round the inner message targets, if the inner message is present.
    pub fn round(&self) -> Option<RoundNumber> {
        self.inner.as_ref().map(|inner| inner.round)
    }
}

/// The protocol-specific part of a [`HareMessage`]: the part covered by the sender's signature.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InnerMessage {
    pub kind: MessageKind,
    pub round: RoundNumber,
    /// Iteration of the Hare protocol within the round that this message belongs to.
    pub iteration: u32,
    pub values: Vec<ValueId>,
    /// Proof that the sender is eligible to send `kind` messages in this round and iteration.
    pub role_proof: Vec<u8>,
}

impl InnerMessage {
    /// Get the bytes that the sender signs over.
    pub fn signing_bytes(&self) -> Vec<u8> {
        // Safety: serializing into a Vec cannot fail.
        self.try_to_vec().unwrap()
    }
}

/// The message types of the Hare protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum MessageKind {
    PreRound,
    Status,
    Proposal,
    Commit,
    Notify,
}

/// Returned by [`HareMessage::from_bytes`] if the bytes are not a valid envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed hare message: {0}")]
    Malformed(#[from] io::Error),
}
