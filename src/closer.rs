//! One-shot shutdown signal.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cloneable, one-shot shutdown signal.
///
/// All clones observe the same signal. Once [`close`](Self::close) has been called on any clone,
/// [`is_closed`](Self::is_closed) returns `true` on every clone forever. Closing twice is a no-op.
///
/// The broker's dispatch thread is the only part of the broker that listens to this signal. Message
/// handling threads that are already running when it fires run to completion.
#[derive(Clone, Debug, Default)]
pub struct Closer {
    closed: Arc<AtomicBool>,
}

impl Closer {
    pub fn new() -> Closer {
        Closer::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
