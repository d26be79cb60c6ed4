#![allow(dead_code)]

pub(crate) mod events;

pub(crate) mod harness;

pub(crate) mod logging;

pub(crate) mod messages;

pub(crate) mod network;

pub(crate) mod validation;
