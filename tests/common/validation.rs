use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    time::Duration,
};

use hare_rs::{
    types::{crypto_primitives::VerifyingKey, data_types::EpochNumber},
    validation::{StateQuerier, StateQueryError, SyncState, Validator, VerifiedMessage},
};

pub(crate) struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _: &VerifiedMessage) -> bool {
        true
    }
}

pub(crate) struct RejectAll;

impl Validator for RejectAll {
    fn validate(&self, _: &VerifiedMessage) -> bool {
        false
    }
}

/// Accepts every message, but only once the test holding the matching [`Gate`] opens it. Lets a
/// test act while a message is between admission and routing.
pub(crate) struct GatedValidator {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

pub(crate) struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl GatedValidator {
    pub(crate) fn new() -> (GatedValidator, Gate) {
        let (entered_sender, entered) = mpsc::channel();
        let (release, release_receiver) = mpsc::channel();
        let validator = GatedValidator {
            entered: Mutex::new(entered_sender),
            release: Mutex::new(release_receiver),
        };
        (validator, Gate { entered, release })
    }
}

impl Validator for GatedValidator {
    fn validate(&self, _: &VerifiedMessage) -> bool {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        true
    }
}

impl Gate {
    /// Wait until a message is being validated.
    pub(crate) fn entered(&self, timeout: Duration) -> bool {
        self.entered.recv_timeout(timeout).is_ok()
    }

    /// Let one message through.
    pub(crate) fn open(&self) {
        self.release.send(()).unwrap()
    }
}

/// Treats every identity as active, and records the epochs it was asked about.
#[derive(Clone, Default)]
pub(crate) struct AllActive {
    pub(crate) queried_epochs: Arc<Mutex<Vec<EpochNumber>>>,
}

impl StateQuerier for AllActive {
    fn is_identity_active(&self, _: &VerifyingKey, epoch: EpochNumber) -> Result<bool, StateQueryError> {
        self.queried_epochs.lock().unwrap().push(epoch);
        Ok(true)
    }
}

pub(crate) struct NoneActive;

impl StateQuerier for NoneActive {
    fn is_identity_active(&self, _: &VerifyingKey, _: EpochNumber) -> Result<bool, StateQueryError> {
        Ok(false)
    }
}

pub(crate) struct Unavailable;

impl StateQuerier for Unavailable {
    fn is_identity_active(&self, _: &VerifyingKey, epoch: EpochNumber) -> Result<bool, StateQueryError> {
        Err(StateQueryError::UnknownEpoch(epoch))
    }
}

/// A synchronization predicate that tests can flip, and that counts how often it was queried.
#[derive(Clone)]
pub(crate) struct SyncSwitch {
    synced: Arc<AtomicBool>,
    queries: Arc<AtomicUsize>,
}

impl SyncSwitch {
    pub(crate) fn new(synced: bool) -> SyncSwitch {
        SyncSwitch {
            synced: Arc::new(AtomicBool::new(synced)),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn set(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl SyncState for SyncSwitch {
    fn is_synced(&self) -> bool {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.synced.load(Ordering::SeqCst)
    }
}
