use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use hare_rs::{
    broker::Classification,
    events::DropReason,
    types::data_types::{CryptoHash, RoundNumber},
};

/// Everything the broker published, in publication order.
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    pub(crate) registered: Arc<Mutex<Vec<(RoundNumber, usize)>>>,
    pub(crate) unregistered: Arc<Mutex<Vec<RoundNumber>>>,
    pub(crate) classified: Arc<Mutex<Vec<(RoundNumber, Classification)>>>,
    pub(crate) buffered: Arc<Mutex<Vec<(RoundNumber, CryptoHash)>>>,
    pub(crate) delivered: Arc<Mutex<Vec<(RoundNumber, CryptoHash)>>>,
    pub(crate) dropped: Arc<Mutex<Vec<(Option<RoundNumber>, DropReason)>>>,
}

impl EventLog {
    pub(crate) fn buffered(&self) -> Vec<(RoundNumber, CryptoHash)> {
        self.buffered.lock().unwrap().clone()
    }

    pub(crate) fn delivered(&self) -> Vec<(RoundNumber, CryptoHash)> {
        self.delivered.lock().unwrap().clone()
    }

    pub(crate) fn dropped(&self) -> Vec<(Option<RoundNumber>, DropReason)> {
        self.dropped.lock().unwrap().clone()
    }

    pub(crate) fn drop_reasons(&self) -> Vec<DropReason> {
        self.dropped().into_iter().map(|(_, reason)| reason).collect()
    }

    pub(crate) fn classified(&self) -> Vec<(RoundNumber, Classification)> {
        self.classified.lock().unwrap().clone()
    }

    pub(crate) fn registered(&self) -> Vec<(RoundNumber, usize)> {
        self.registered.lock().unwrap().clone()
    }

    /// Number of gossip items whose handling has finished: every handled item ends up buffered,
    /// delivered, or dropped.
    pub(crate) fn handled(&self) -> usize {
        self.buffered.lock().unwrap().len()
            + self.delivered.lock().unwrap().len()
            + self.dropped.lock().unwrap().len()
    }
}

/// Poll `condition` until it holds or `timeout` passes. Returns whether it held.
pub(crate) fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
