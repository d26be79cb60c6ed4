/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The dispatch thread, which reads gossip items from the [network](super::GossipNetwork) and hands
//! each of them to its own message handling thread.

use std::{
    io,
    sync::{
        mpsc::{Receiver, RecvTimeoutError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{broker::handling, broker::BrokerCore, closer::Closer};

use super::GossipMessage;

/// Spawn the dispatch thread.
///
/// The dispatch thread is the only reader of `inbox`. For every item it receives it spawns a
/// handling thread and immediately goes back to reading, so that a slow validator or a full
/// mailbox never stalls intake from the network. It never decodes, validates, or locks anything
/// itself.
///
/// The thread exits when `closer` fires or when `inbox` disconnects. While the inbox is idle it
/// checks `closer` every `poll_interval`.
pub(crate) fn start_dispatching<M: GossipMessage>(
    inbox: Receiver<M>,
    core: Arc<BrokerCore>,
    closer: Closer,
    poll_interval: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(String::from("hare-dispatch"))
        .spawn(move || loop {
            if closer.is_closed() {
                log::warn!("Broker exiting");
                return;
            }

            match inbox.recv_timeout(poll_interval) {
                Ok(item) => handling::spawn_handler(Arc::clone(&core), item),
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("Broker exiting: gossip inbox disconnected");
                    return;
                }
            }
        })
}
