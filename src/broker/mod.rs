/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, start, and drive the broker.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the broker](BrokerSpec) and its
//!   [configuration](Configuration),
//! - [The broker](Broker) itself, with its lifecycle methods [`start`](Broker::start),
//!   [`register`](Broker::register), and [`unregister`](Broker::unregister),
//! - [The mailbox](Mailbox) that a registered round's consensus instance reads its messages from.
//!
//! ## Building a broker
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .layers_per_epoch(EpochLength::new(4032))
//!     .log_events(true)
//!     .build();
//!
//! let broker =
//!     BrokerSpec::builder()
//!     .network(network)
//!     .validator(validator)
//!     .state_querier(state_querier)
//!     .sync_state(move || syncer.is_synced())
//!     .configuration(configuration)
//!     .on_drop_message(drop_handler)
//!     .build()
//!     .into_broker();
//!
//! broker.start()?;
//! let mailbox = broker.register(round)?;
//! ```
//!
//! ## Registering rounds
//!
//! The consensus engine calls [`register`](Broker::register) when it starts the Hare instance for a
//! round, and [`unregister`](Broker::unregister) when the instance terminates. Calling `register`
//! twice for the same round without an `unregister` in between replaces the round's mailbox: the
//! first mailbox stops receiving messages, and whatever was already delivered to it stays there.
//! The broker does not guard against this.
//!
//! Messages for the round right after the latest registered round are buffered until that round
//! is registered, and then flushed into its mailbox in arrival order. A message that races with
//! the `register` call for its round ends up either in the mailbox or dropped; delivery is best
//! effort.

pub(crate) mod handling;

mod mailbox;
pub use mailbox::Mailbox;

mod rounds;
pub use rounds::{Classification, Invalidity};

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    thread::JoinHandle,
    time::{Duration, SystemTime},
};

use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    closer::Closer,
    event_bus::{start_event_bus, EventHandlers, HandlerPtr},
    events::*,
    networking::{receiving::start_dispatching, GossipNetwork, PROTOCOL_NAME},
    types::data_types::{EpochLength, RoundNumber},
    validation::{StateQuerier, SyncState, Validator},
};

use rounds::RoundTable;

/// Default capacity of a round's pending buffer.
pub const INBOX_CAPACITY: usize = 1024;

/// A round's mailbox holds this many times as many messages as its pending buffer, so that
/// flushing a full pending buffer into a fresh mailbox never blocks.
pub const MAILBOX_CAPACITY_FACTOR: usize = 5;

/// Stores the user-defined parameters of the broker, that is:
/// 1. The pending buffer capacity: how many early messages are buffered per round.
/// 2. The number of rounds ("layers") per epoch, used to look up sender identities.
/// 3. The dispatch poll interval: how often the idle dispatch thread checks for shutdown.
/// 4. The "Log Events" flag. If set to "true", every [event](crate::events) is logged.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.layers_per_epoch(...)`

    Optional:
    - `.pending_buffer_capacity(...)`
    - `.dispatch_poll_interval(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(
        default = INBOX_CAPACITY,
        setter(doc = "Set the maximum number of early messages buffered per round. Optional, defaults to 1024.")
    )]
    pub pending_buffer_capacity: usize,
    #[builder(setter(doc = "Set the number of rounds in an epoch. Required."))]
    pub layers_per_epoch: EpochLength,
    #[builder(
        default = Duration::from_millis(10),
        setter(doc = "Set how often the idle dispatch thread checks whether it should shut down. Optional, defaults to 10ms.")
    )]
    pub dispatch_poll_interval: Duration,
    #[builder(default = false, setter(doc = "Enable logging of events? Optional, defaults to false."))]
    pub log_events: bool,
}

impl Configuration {
    /// Get the capacity of the mailbox created for each registered round.
    pub fn mailbox_capacity(&self) -> usize {
        self.pending_buffer_capacity
            .saturating_mul(MAILBOX_CAPACITY_FACTOR)
    }
}

/// Stores all the parameters and trait implementations required to run a [Broker].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [BrokerSpec]. On the builder call the following methods to construct a valid [BrokerSpec].

    Required:
    - `.network(...)`
    - `.validator(...)`
    - `.state_querier(...)`
    - `.sync_state(...)`
    - `.configuration(...)`

    Optional:
    - `.closer(...)`
    - `.on_register_round(...)`
    - `.on_unregister_round(...)`
    - `.on_classify_round(...)`
    - `.on_buffer_message(...)`
    - `.on_deliver_message(...)`
    - `.on_drop_message(...)`
"))]
pub struct BrokerSpec<N: GossipNetwork> {
    // Required parameters
    #[builder(setter(doc = "Set the gossip transport. The argument must implement the [GossipNetwork](crate::networking::GossipNetwork) trait. Required."))]
    network: N,
    #[builder(setter(
        transform = |validator: impl Validator + 'static| Box::new(validator) as Box<dyn Validator>,
        doc = "Set the protocol-specific message validator. Required."
    ))]
    validator: Box<dyn Validator>,
    #[builder(setter(
        transform = |state_querier: impl StateQuerier + 'static| Box::new(state_querier) as Box<dyn StateQuerier>,
        doc = "Set the lookup of active identities. Required."
    ))]
    state_querier: Box<dyn StateQuerier>,
    #[builder(setter(
        transform = |sync_state: impl SyncState + 'static| Box::new(sync_state) as Box<dyn SyncState>,
        doc = "Set the predicate that tells whether the node is synchronized with the network. Required."
    ))]
    sync_state: Box<dyn SyncState>,
    #[builder(setter(doc = "Set the [configuration](Configuration). Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(doc = "Set the shutdown signal that stops the broker's dispatch thread. Optional."))]
    closer: Closer,
    #[builder(default, setter(transform = |handler: impl Fn(&RegisterRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RegisterRoundEvent>),
    doc = "Register a handler closure to be invoked after a round is registered. Optional."))]
    on_register_round: Option<HandlerPtr<RegisterRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UnregisterRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UnregisterRoundEvent>),
    doc = "Register a handler closure to be invoked after a round is unregistered. Optional."))]
    on_unregister_round: Option<HandlerPtr<UnregisterRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ClassifyRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ClassifyRoundEvent>),
    doc = "Register a handler closure to be invoked after a round is classified for the first time. Optional."))]
    on_classify_round: Option<HandlerPtr<ClassifyRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&BufferMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<BufferMessageEvent>),
    doc = "Register a handler closure to be invoked after an early message is buffered. Optional."))]
    on_buffer_message: Option<HandlerPtr<BufferMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DeliverMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DeliverMessageEvent>),
    doc = "Register a handler closure to be invoked after a message is delivered into a mailbox. Optional."))]
    on_deliver_message: Option<HandlerPtr<DeliverMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DropMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DropMessageEvent>),
    doc = "Register a handler closure to be invoked after a message is dropped. Optional."))]
    on_drop_message: Option<HandlerPtr<DropMessageEvent>>,
}

impl<N: GossipNetwork> BrokerSpec<N> {
    /// Create the [Broker] described by this specification. This starts the event bus thread if any
    /// event handler is registered, but does not start reading from the network: call
    /// [`start`](Broker::start) for that.
    pub fn into_broker(self) -> Broker<N> {
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_register_round,
            self.on_unregister_round,
            self.on_classify_round,
            self.on_buffer_message,
            self.on_deliver_message,
            self.on_drop_message,
        );

        let (event_publisher, event_bus, event_bus_shutdown) = if !event_handlers.is_empty() {
            let (event_publisher, event_subscriber) = mpsc::channel();
            let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
            let event_bus = start_event_bus(
                event_handlers,
                event_subscriber,
                event_bus_shutdown_receiver,
            );
            (Some(event_publisher), Some(event_bus), Some(event_bus_shutdown))
        } else {
            (None, None, None)
        };

        let core = BrokerCore {
            rounds: RwLock::new(RoundTable::new()),
            validator: self.validator,
            state_querier: self.state_querier,
            sync_state: self.sync_state,
            pending_buffer_capacity: self.configuration.pending_buffer_capacity,
            mailbox_capacity: self.configuration.mailbox_capacity(),
            layers_per_epoch: self.configuration.layers_per_epoch,
            event_publisher,
        };

        Broker {
            core: Arc::new(core),
            network: Mutex::new(self.network),
            closer: self.closer,
            dispatch_poll_interval: self.configuration.dispatch_poll_interval,
            started: AtomicBool::new(false),
            dispatcher: Mutex::new(None),
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// Routes gossiped Hare messages to the mailboxes of registered rounds.
///
/// All methods take `&self`, so a `Broker` can be shared in an [`Arc`] between the consensus engine
/// and any other thread. When the `Broker` is dropped, its [`Closer`] is closed, the dispatch
/// thread and the event bus are shut down and joined. Message handling threads that are still
/// running are left to complete on their own.
pub struct Broker<N: GossipNetwork> {
    core: Arc<BrokerCore>,
    network: Mutex<N>,
    closer: Closer,
    dispatch_poll_interval: Duration,
    started: AtomicBool,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<N: GossipNetwork> Broker<N> {
    /// Subscribe to [`PROTOCOL_NAME`] on the network and start dispatching its messages. Returns
    /// immediately.
    ///
    /// Fails with [`StartError::AlreadyStarted`] if called more than once. A failed call has no
    /// effect on the running dispatch thread.
    ///
    /// Fails with [`StartError::Spawn`] if the dispatch thread cannot be spawned. The broker then
    /// counts as not started, and a later call subscribes to the network again.
    pub fn start(&self) -> Result<(), StartError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::error!("Could not start broker: already started");
            return Err(StartError::AlreadyStarted);
        }

        let inbox = self
            .network
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register_gossip_protocol(PROTOCOL_NAME);

        let dispatcher = match start_dispatching(
            inbox,
            Arc::clone(&self.core),
            self.closer.clone(),
            self.dispatch_poll_interval,
        ) {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                log::error!("Could not start broker: {}", err);
                self.started.store(false, Ordering::Release);
                return Err(StartError::Spawn(err));
            }
        };
        *self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(dispatcher);

        Ok(())
    }

    /// Register `round` and return the mailbox its messages will be delivered to. Early messages
    /// buffered for the round are moved into the mailbox first, in arrival order.
    ///
    /// `round` normally is newer than every round registered before. If it is not, the latest round
    /// is left as it is and registration carries on.
    ///
    /// Fails with [`RegisterError::NotSynced`], creating no mailbox, if the round is classified
    /// invalid, either now or by an earlier classification.
    pub fn register(&self, round: RoundNumber) -> Result<Mailbox, RegisterError> {
        let mut rounds = self.core.write_rounds();

        if !rounds.update_latest_round(round) {
            log::error!(
                "Tried to update a previous round: expected {} > {}",
                round,
                rounds.latest_round()
            );
        }

        if self.core.classify(&mut rounds, round) != Classification::Valid {
            return Err(RegisterError::NotSynced(round));
        }

        let (mailbox, flushed) = rounds.open_mailbox(round, self.core.mailbox_capacity);
        drop(rounds);

        Event::RegisterRound(RegisterRoundEvent {
            timestamp: SystemTime::now(),
            round,
            flushed,
        })
        .publish(&self.core.event_publisher);

        Ok(mailbox)
    }

    /// Unregister `round`. Messages for the round are dropped from now on, and it cannot be
    /// registered again.
    ///
    /// Early messages still buffered for the round are discarded.
    ///
    /// The round's mailbox is not drained. Messages that were being delivered concurrently with
    /// this call may still arrive in it.
    pub fn unregister(&self, round: RoundNumber) {
        self.core.write_rounds().close(round);
        log::info!("Unregistered round {}", round);

        Event::UnregisterRound(UnregisterRoundEvent {
            timestamp: SystemTime::now(),
            round,
        })
        .publish(&self.core.event_publisher);
    }

    /// Fire the shutdown signal. The dispatch thread exits within one poll interval.
    pub fn close(&self) {
        self.closer.close();
    }

    /// Get the latest round that was registered.
    pub fn latest_round(&self) -> RoundNumber {
        self.core.read_rounds().latest_round()
    }

    /// Get the current classification of `round`, without classifying it.
    pub fn classification(&self, round: RoundNumber) -> Classification {
        self.core.read_rounds().classification(round)
    }
}

impl<N: GossipNetwork> Drop for Broker<N> {
    fn drop(&mut self) {
        self.closer.close();

        let dispatcher = self
            .dispatcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(dispatcher) = dispatcher {
            let _ = dispatcher.join();
        }

        if let Some(event_bus_shutdown) = &self.event_bus_shutdown {
            let _ = event_bus_shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }
    }
}

/// The state shared between the broker and its message handling threads.
pub(crate) struct BrokerCore {
    rounds: RwLock<RoundTable>,
    validator: Box<dyn Validator>,
    state_querier: Box<dyn StateQuerier>,
    sync_state: Box<dyn SyncState>,
    pending_buffer_capacity: usize,
    mailbox_capacity: usize,
    layers_per_epoch: EpochLength,
    event_publisher: Option<Sender<Event>>,
}

impl BrokerCore {
    // The round table is only mutated by code that cannot panic halfway, so a poisoned lock still
    // guards consistent state.
    fn read_rounds(&self) -> RwLockReadGuard<'_, RoundTable> {
        self.rounds.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rounds(&self) -> RwLockWriteGuard<'_, RoundTable> {
        self.rounds.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Classify `round` in `rounds`, publishing the classification if it is new.
    fn classify(&self, rounds: &mut RoundTable, round: RoundNumber) -> Classification {
        let (classification, is_new) = rounds.classify(round, self.sync_state.as_ref());
        if is_new {
            Event::ClassifyRound(ClassifyRoundEvent {
                timestamp: SystemTime::now(),
                round,
                classification,
            })
            .publish(&self.event_publisher);
        }
        classification
    }
}

/// Returned by [`Broker::start`].
#[derive(Debug, Error)]
pub enum StartError {
    #[error("broker already started")]
    AlreadyStarted,
    #[error("could not spawn the dispatch thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Returned by [`Broker::register`].
#[derive(Debug, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("round {0} is not synced")]
    NotSynced(RoundNumber),
}
