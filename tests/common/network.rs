use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};

use hare_rs::networking::{GossipMessage, GossipNetwork};

/// A validation outcome reported by the broker for a gossip item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ValidationReport {
    pub(crate) protocol: String,
    pub(crate) is_valid: bool,
    pub(crate) bytes: Vec<u8>,
}

/// A mock gossip network which passes items to the broker through a channel, and records the
/// validation reports the broker makes.
#[derive(Clone, Default)]
pub(crate) struct MockNetwork {
    inbox: Arc<Mutex<Option<Sender<MockGossipMessage>>>>,
    registrations: Arc<Mutex<Vec<&'static str>>>,
    reports: Arc<Mutex<Vec<ValidationReport>>>,
}

impl MockNetwork {
    pub(crate) fn new() -> MockNetwork {
        MockNetwork::default()
    }

    /// Gossip `bytes` to the broker. Returns `false` if the broker is not listening.
    pub(crate) fn gossip(&self, bytes: Vec<u8>) -> bool {
        let item = MockGossipMessage {
            bytes,
            reports: Arc::clone(&self.reports),
        };
        match self.inbox.lock().unwrap().as_ref() {
            Some(inbox) => inbox.send(item).is_ok(),
            None => false,
        }
    }

    pub(crate) fn registrations(&self) -> Vec<&'static str> {
        self.registrations.lock().unwrap().clone()
    }

    pub(crate) fn reports(&self) -> Vec<ValidationReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl GossipNetwork for MockNetwork {
    type Message = MockGossipMessage;

    fn register_gossip_protocol(&mut self, protocol: &'static str) -> Receiver<MockGossipMessage> {
        let (sender, receiver) = mpsc::channel();
        *self.inbox.lock().unwrap() = Some(sender);
        self.registrations.lock().unwrap().push(protocol);
        receiver
    }
}

pub(crate) struct MockGossipMessage {
    bytes: Vec<u8>,
    reports: Arc<Mutex<Vec<ValidationReport>>>,
}

impl GossipMessage for MockGossipMessage {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn report_validation(&self, protocol: &str, is_valid: bool) {
        self.reports.lock().unwrap().push(ValidationReport {
            protocol: protocol.to_string(),
            is_valid,
            bytes: self.bytes.clone(),
        })
    }
}
