//! Notification relay.
//!
//! Subscribes to hookbot event streams, records ding payloads in a bounded
//! history served as a feed over HTTP, and forwards routed chat payloads to a
//! chat webhook.

pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod errors;
pub mod feed;
pub mod forwarder;
pub mod history;
pub mod message;
pub mod metrics_defs;
pub mod subscription;

#[cfg(test)]
mod testutils;

use config::Config;
use dispatch::Dispatcher;
use errors::RelayError;
use feed::FeedService;
use forwarder::{Forward, WebhookForwarder};
use history::DingHistory;
use http::HeaderMap;
use shared::http::run_http_service;
use std::future::Future;
use std::sync::Arc;
use subscription::{Subscription, subscribe_all};
use tokio_util::sync::CancellationToken;

/// Runs the relay until the event stream closes or the feed listener fails.
/// Both outcomes are returned as errors: the relay is not meant to stop.
pub async fn run(config: Config) -> Result<(), RelayError> {
    config.validate()?;

    let relay = Relay::new(&config);
    let cancel = CancellationToken::new();
    let subscription = subscribe_all(
        config.subscriptions.clone(),
        HeaderMap::new(),
        cancel.clone(),
    );
    let feed = run_http_service(
        &config.listener.host,
        config.listener.port,
        relay.feed_service(),
    );

    let result = relay.run(feed, subscription).await;
    cancel.cancel();
    result
}

/// The history and dispatcher, wired together.
pub struct Relay {
    history: DingHistory,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(config: &Config) -> Self {
        let forwarder = WebhookForwarder::new(config.webhook_url.clone());
        if !forwarder.is_enabled() {
            tracing::info!("SLACK_WEBHOOK_URL not set: will not notify in chat");
        }

        let history = DingHistory::new(config.history.capacity);
        let dispatcher = Dispatcher::new(
            history.clone(),
            Arc::new(forwarder),
            config.chat.clone(),
        );

        Relay {
            history,
            dispatcher,
        }
    }

    pub fn history(&self) -> &DingHistory {
        &self.history
    }

    pub fn feed_service(&self) -> FeedService {
        FeedService::new(self.history.clone())
    }

    /// Drives the dispatch loop alongside `feed`, returning when either ends.
    pub async fn run<F>(&self, feed: F, subscription: Subscription) -> Result<(), RelayError>
    where
        F: Future<Output = Result<(), RelayError>>,
    {
        tokio::select! {
            result = feed => result,
            _ = self.dispatcher.run(subscription) => Err(RelayError::StreamClosed),
        }
    }
}
