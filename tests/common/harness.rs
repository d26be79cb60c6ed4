use std::time::Duration;

use hare_rs::{
    broker::{Broker, BrokerSpec, Configuration},
    closer::Closer,
    types::data_types::EpochLength,
    validation::{StateQuerier, Validator},
};

use super::{events::EventLog, network::MockNetwork, validation::SyncSwitch};

pub(crate) const LAYERS_PER_EPOCH: EpochLength = EpochLength::new(4);

/// A broker wired to a mock network, a flippable sync predicate, and an event log.
pub(crate) struct Harness {
    pub(crate) broker: Broker<MockNetwork>,
    pub(crate) network: MockNetwork,
    pub(crate) sync: SyncSwitch,
    pub(crate) events: EventLog,
    pub(crate) closer: Closer,
}

impl Harness {
    pub(crate) fn new(
        validator: impl Validator + 'static,
        state_querier: impl StateQuerier + 'static,
        synced: bool,
    ) -> Harness {
        Harness::with_configuration(
            validator,
            state_querier,
            synced,
            Configuration::builder()
                .layers_per_epoch(LAYERS_PER_EPOCH)
                .dispatch_poll_interval(Duration::from_millis(5))
                .log_events(true)
                .build(),
        )
    }

    pub(crate) fn with_configuration(
        validator: impl Validator + 'static,
        state_querier: impl StateQuerier + 'static,
        synced: bool,
        configuration: Configuration,
    ) -> Harness {
        let network = MockNetwork::new();
        let sync = SyncSwitch::new(synced);
        let events = EventLog::default();
        let closer = Closer::new();

        let registered = events.registered.clone();
        let unregistered = events.unregistered.clone();
        let classified = events.classified.clone();
        let buffered = events.buffered.clone();
        let delivered = events.delivered.clone();
        let dropped = events.dropped.clone();

        let broker = BrokerSpec::builder()
            .network(network.clone())
            .validator(validator)
            .state_querier(state_querier)
            .sync_state(sync.clone())
            .configuration(configuration)
            .closer(closer.clone())
            .on_register_round(move |event| {
                registered.lock().unwrap().push((event.round, event.flushed))
            })
            .on_unregister_round(move |event| unregistered.lock().unwrap().push(event.round))
            .on_classify_round(move |event| {
                classified
                    .lock()
                    .unwrap()
                    .push((event.round, event.classification))
            })
            .on_buffer_message(move |event| {
                buffered.lock().unwrap().push((event.round, event.message))
            })
            .on_deliver_message(move |event| {
                delivered.lock().unwrap().push((event.round, event.message))
            })
            .on_drop_message(move |event| dropped.lock().unwrap().push((event.round, event.reason)))
            .build()
            .into_broker();

        Harness {
            broker,
            network,
            sync,
            events,
            closer,
        }
    }

    /// A started broker that accepts every message from every identity.
    pub(crate) fn started(synced: bool) -> Harness {
        let harness = Harness::new(
            super::validation::AcceptAll,
            super::validation::AllActive::default(),
            synced,
        );
        harness.broker.start().unwrap();
        harness
    }
}
