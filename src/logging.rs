/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the broker's
//! [configuration](crate::broker::Configuration).
//!
//! The broker logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [BufferMessage](crate::events::BufferMessageEvent) is printed:
//!
//! ```text
//! BufferMessage, 1701329264, 42, Id5u7f6, fNGCJyk, 3
//! ```
//!
//! In the snippet:
//! - The third value is the round of the message.
//! - The fourth value is the first seven characters of the Base64 encoding of the sender's public key.
//! - The fifth value is the first seven characters of the Base64 encoding of the message digest.
//! - The sixth value is the number of messages in the round's pending buffer.

use crate::events::*;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::time::SystemTime;

// Names of each event in PascalCase for printing:
pub const REGISTER_ROUND: &str = "RegisterRound";
pub const UNREGISTER_ROUND: &str = "UnregisterRound";
pub const CLASSIFY_ROUND: &str = "ClassifyRound";

pub const BUFFER_MESSAGE: &str = "BufferMessage";
pub const DELIVER_MESSAGE: &str = "DeliverMessage";
pub const DROP_MESSAGE: &str = "DropMessage";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for RegisterRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |register_round_event: &RegisterRoundEvent| {
            log::info!(
                "{}, {}, {}, {}",
                REGISTER_ROUND,
                secs_since_unix_epoch(register_round_event.timestamp),
                register_round_event.round,
                register_round_event.flushed
            )
        };
        Box::new(logger)
    }
}

impl Logger for UnregisterRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |unregister_round_event: &UnregisterRoundEvent| {
            log::info!(
                "{}, {}, {}",
                UNREGISTER_ROUND,
                secs_since_unix_epoch(unregister_round_event.timestamp),
                unregister_round_event.round
            )
        };
        Box::new(logger)
    }
}

impl Logger for ClassifyRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |classify_round_event: &ClassifyRoundEvent| {
            log::info!(
                "{}, {}, {}, {:?}",
                CLASSIFY_ROUND,
                secs_since_unix_epoch(classify_round_event.timestamp),
                classify_round_event.round,
                classify_round_event.classification
            )
        };
        Box::new(logger)
    }
}

impl Logger for BufferMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |buffer_message_event: &BufferMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                BUFFER_MESSAGE,
                secs_since_unix_epoch(buffer_message_event.timestamp),
                buffer_message_event.round,
                first_seven_base64_chars(&buffer_message_event.sender.to_bytes()),
                first_seven_base64_chars(&buffer_message_event.message.bytes()),
                buffer_message_event.buffered
            )
        };
        Box::new(logger)
    }
}

impl Logger for DeliverMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |deliver_message_event: &DeliverMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                DELIVER_MESSAGE,
                secs_since_unix_epoch(deliver_message_event.timestamp),
                deliver_message_event.round,
                first_seven_base64_chars(&deliver_message_event.sender.to_bytes()),
                first_seven_base64_chars(&deliver_message_event.message.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for DropMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |drop_message_event: &DropMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                DROP_MESSAGE,
                secs_since_unix_epoch(drop_message_event.timestamp),
                drop_message_event
                    .round
                    .map_or(String::from("-"), |round| round.to_string()),
                drop_message_event
                    .message
                    .map_or(String::from("-"), |message| first_seven_base64_chars(
                        &message.bytes()
                    )),
                drop_message_event.reason
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
