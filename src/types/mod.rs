//! Types that are used across multiple components of the broker.
//!
//! Types specific to a single component, e.g., [`crate::broker::Mailbox`], live in that
//! component's module.

pub mod data_types;

pub mod crypto_primitives;
