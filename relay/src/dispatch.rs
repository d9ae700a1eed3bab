//! Event dispatch loop: routes decoded payloads to the ding history and the
//! chat forwarder.

use crate::config::ChatConfig;
use crate::decoder::{DecodedEvent, decode};
use crate::forwarder::Forward;
use crate::history::DingHistory;
use crate::message::ChatMessage;
use crate::metrics_defs::{EVENTS_RECEIVED, FORWARD_DELIVERED, FORWARD_FAILED, STREAM_ERRORS};
use crate::subscription::Subscription;
use shared::counter;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

pub struct Dispatcher {
    history: DingHistory,
    forwarder: Arc<dyn Forward>,
    chat: ChatConfig,
}

impl Dispatcher {
    pub fn new(history: DingHistory, forwarder: Arc<dyn Forward>, chat: ChatConfig) -> Self {
        Dispatcher {
            history,
            forwarder,
            chat,
        }
    }

    /// Consumes the subscription until its event stream closes. Stream errors
    /// are logged and never end the loop.
    pub async fn run(&self, subscription: Subscription) -> LoopState {
        let Subscription {
            mut events,
            mut errors,
        } = subscription;
        let mut errors_open = true;
        let mut state = LoopState::Running;

        while state == LoopState::Running {
            tokio::select! {
                event = events.recv() => match event {
                    Some(payload) => {
                        self.handle_event(&payload);
                    }
                    None => state = LoopState::Stopped,
                },
                err = errors.recv(), if errors_open => match err {
                    Some(err) => {
                        tracing::warn!("Error in event stream: {err}");
                        counter!(STREAM_ERRORS).increment(1);
                    }
                    None => errors_open = false,
                },
            }
        }

        tracing::error!("event stream closed");
        state
    }

    /// Decodes one payload and acts on it. Chat delivery is spawned and not
    /// awaited, so this must run inside a tokio runtime.
    pub fn handle_event(&self, payload: &[u8]) -> DecodedEvent {
        tracing::debug!(payload = ?String::from_utf8_lossy(payload), "Received event");
        counter!(EVENTS_RECEIVED).increment(1);

        let event = decode(payload, self.chat.route_layout);
        match &event {
            DecodedEvent::DingCount(count) => {
                self.history.record_now(*count);
                if self.chat.announce_dings {
                    let text = String::from_utf8_lossy(payload);
                    self.spawn_forward(ChatMessage::with_defaults(text, &self.chat.defaults));
                }
            }
            DecodedEvent::RoutedMessage(routed) => {
                self.spawn_forward(ChatMessage::from_routed(routed.clone(), &self.chat.defaults));
            }
        }
        event
    }

    fn spawn_forward(&self, message: ChatMessage) {
        if !self.forwarder.is_enabled() {
            return;
        }

        let forwarder = self.forwarder.clone();
        tokio::spawn(async move {
            match forwarder.forward(message).await {
                Ok(()) => counter!(FORWARD_DELIVERED).increment(1),
                Err(err) => {
                    tracing::warn!("Error sending message to chat: {err}");
                    counter!(FORWARD_FAILED).increment(1);
                }
            }
        });
    }
}
