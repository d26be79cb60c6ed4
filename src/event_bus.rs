//! The event bus thread, which fires user-defined and logging handlers for published [events](crate::events).

use crate::events::*;
use crate::logging::Logger;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

const EVENT_BUS_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct EventHandlers {
    pub(crate) register_round_handlers: Vec<HandlerPtr<RegisterRoundEvent>>,
    pub(crate) unregister_round_handlers: Vec<HandlerPtr<UnregisterRoundEvent>>,
    pub(crate) classify_round_handlers: Vec<HandlerPtr<ClassifyRoundEvent>>,
    pub(crate) buffer_message_handlers: Vec<HandlerPtr<BufferMessageEvent>>,
    pub(crate) deliver_message_handlers: Vec<HandlerPtr<DeliverMessageEvent>>,
    pub(crate) drop_message_handlers: Vec<HandlerPtr<DropMessageEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, adding the default logger for every event kind if
    /// `log_events` is set.
    pub(crate) fn new(
        log_events: bool,
        register_round_handler: Option<HandlerPtr<RegisterRoundEvent>>,
        unregister_round_handler: Option<HandlerPtr<UnregisterRoundEvent>>,
        classify_round_handler: Option<HandlerPtr<ClassifyRoundEvent>>,
        buffer_message_handler: Option<HandlerPtr<BufferMessageEvent>>,
        deliver_message_handler: Option<HandlerPtr<DeliverMessageEvent>>,
        drop_message_handler: Option<HandlerPtr<DropMessageEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            register_round_handlers: handlers(log_events, register_round_handler),
            unregister_round_handlers: handlers(log_events, unregister_round_handler),
            classify_round_handlers: handlers(log_events, classify_round_handler),
            buffer_message_handlers: handlers(log_events, buffer_message_handler),
            deliver_message_handlers: handlers(log_events, deliver_message_handler),
            drop_message_handlers: handlers(log_events, drop_message_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.register_round_handlers.is_empty()
            && self.unregister_round_handlers.is_empty()
            && self.classify_round_handlers.is_empty()
            && self.buffer_message_handlers.is_empty()
            && self.deliver_message_handlers.is_empty()
            && self.drop_message_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::RegisterRound(register_round_event) => self
                .register_round_handlers
                .iter()
                .for_each(|handler| handler(&register_round_event)),

            Event::UnregisterRound(unregister_round_event) => self
                .unregister_round_handlers
                .iter()
                .for_each(|handler| handler(&unregister_round_event)),

            Event::ClassifyRound(classify_round_event) => self
                .classify_round_handlers
                .iter()
                .for_each(|handler| handler(&classify_round_event)),

            Event::BufferMessage(buffer_message_event) => self
                .buffer_message_handlers
                .iter()
                .for_each(|handler| handler(&buffer_message_event)),

            Event::DeliverMessage(deliver_message_event) => self
                .deliver_message_handlers
                .iter()
                .for_each(|handler| handler(&deliver_message_event)),

            Event::DropMessage(drop_message_event) => self
                .drop_message_handlers
                .iter()
                .for_each(|handler| handler(&drop_message_event)),
        }
    }
}

fn handlers<E: Logger>(log_events: bool, handler: Option<HandlerPtr<E>>) -> Vec<HandlerPtr<E>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(E::get_logger());
    }
    handlers.extend(handler);
    handlers
}

pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            // The broker is gone without saying goodbye; nothing left to serve.
            Err(TryRecvError::Disconnected) => return,
        }

        match event_subscriber.recv_timeout(EVENT_BUS_POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
