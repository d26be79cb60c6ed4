/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Add,
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Round number. Names one ledger round ("layer"), and with it one Hare consensus instance.
///
/// Round numbers only ever increase. The broker tracks the highest round that was
/// [registered](crate::broker::Broker::register) so far, and treats messages for the round right
/// after it as "early".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct RoundNumber(u64);

impl RoundNumber {
    /// Create a new `RoundNumber` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the initial `RoundNumber`, which is 0.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the inner `u64` of this `RoundNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the epoch that this round belongs to, given that every epoch spans `epoch_length` rounds.
    ///
    /// An `epoch_length` of 0 places every round in epoch 0.
    pub fn epoch(&self, epoch_length: EpochLength) -> EpochNumber {
        EpochNumber::new(
            self.0
                .checked_div(epoch_length.int() as u64)
                .unwrap_or(0),
        )
    }
}

impl Display for RoundNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for RoundNumber {
    type Output = RoundNumber;

    fn add(self, rhs: u64) -> Self::Output {
        RoundNumber(self.0.saturating_add(rhs))
    }
}

/// Epoch number. An epoch is a fixed-length run of consecutive rounds, over which the set of
/// active identities does not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochNumber(u64);

impl EpochNumber {
    /// Create a new `EpochNumber` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` of this `EpochNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for EpochNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Configurable number of rounds in an epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochLength(u32);

impl EpochLength {
    /// Create a new `EpochLength` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` value of this `EpochLength`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

/// Identifier of a value (a block) that a Hare instance is trying to agree on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct ValueId(u64);

impl ValueId {
    /// Create a new `ValueId` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` of this `ValueId`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

/// 32-byte cryptographic hash. Within the broker these are always SHA256 hashes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ed25519 digital signature, as it appears on the wire.
#[derive(Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Create a new `SignatureBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 64]` value of this `SignatureBytes`.
    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ed25519 public key, as it appears on the wire.
///
/// The bytes are not guaranteed to form a valid key. They are only checked when a message is
/// turned into a [`VerifiedMessage`](crate::validation::VerifiedMessage).
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct VerifyingKeyBytes([u8; 32]);

impl VerifyingKeyBytes {
    /// Create a new `VerifyingKeyBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `VerifyingKeyBytes`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Debug for VerifyingKeyBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
