use hare_rs::{
    messages::{HareMessage, InnerMessage, MessageKind},
    types::{
        crypto_primitives::{Keypair, SigningKey},
        data_types::{RoundNumber, ValueId},
    },
};
use rand_core::OsRng;

pub(crate) fn keypair() -> Keypair {
    let mut csprg = OsRng {};
    Keypair::new(SigningKey::generate(&mut csprg))
}

/// A status message for `round`. Messages with different `iteration`s are distinct.
pub(crate) fn inner_message(round: u64, iteration: u32) -> InnerMessage {
    InnerMessage {
        kind: MessageKind::Status,
        round: RoundNumber::new(round),
        iteration,
        values: vec![ValueId::new(1), ValueId::new(2)],
        role_proof: vec![7; 8],
    }
}

pub(crate) fn signed_message(keypair: &Keypair, round: u64, iteration: u32) -> HareMessage {
    HareMessage::new(keypair, inner_message(round, iteration))
}

pub(crate) fn signed_bytes(keypair: &Keypair, round: u64, iteration: u32) -> Vec<u8> {
    signed_message(keypair, round, iteration).to_bytes()
}
