//! Always-reconnecting subscription to a hookbot event stream.
//!
//! Each subscribed URL gets a worker task that keeps a websocket open and
//! pushes every received frame onto the event channel. Failures go to a
//! separate error channel and the worker reconnects with exponential backoff.
//! Both channels close once every worker has stopped, which only happens on
//! cancellation or when the event receiver is dropped.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

const CHANNEL_SIZE: usize = 64;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(thiserror::Error, Debug)]
pub enum SubscriptionError {
    #[error("unsupported subscription URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("could not connect to {origin}: {source}")]
    Connect {
        origin: String,
        source: tungstenite::Error,
    },
    #[error("stream from {origin} failed: {source}")]
    Stream {
        origin: String,
        source: tungstenite::Error,
    },
    #[error("stream from {0} closed by server")]
    Closed(String),
}

/// Payloads and errors produced by one or more subscription workers.
pub struct Subscription {
    pub events: mpsc::Receiver<Bytes>,
    pub errors: mpsc::Receiver<SubscriptionError>,
}

impl Subscription {
    pub fn new(
        events: mpsc::Receiver<Bytes>,
        errors: mpsc::Receiver<SubscriptionError>,
    ) -> Self {
        Subscription { events, errors }
    }
}

pub fn subscribe(url: Url, headers: HeaderMap, cancel: CancellationToken) -> Subscription {
    subscribe_all(vec![url], headers, cancel)
}

/// Subscribes to every URL and merges their payloads into one stream.
pub fn subscribe_all(urls: Vec<Url>, headers: HeaderMap, cancel: CancellationToken) -> Subscription {
    let (event_tx, events) = mpsc::channel(CHANNEL_SIZE);
    let (error_tx, errors) = mpsc::channel(CHANNEL_SIZE);

    for url in urls {
        let worker = Worker {
            origin: origin(&url),
            url,
            headers: headers.clone(),
            events: event_tx.clone(),
            errors: error_tx.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(worker.run());
    }

    Subscription::new(events, errors)
}

enum Disconnect {
    Cancelled,
    ReceiverGone,
    Lost(SubscriptionError),
}

struct Worker {
    url: Url,
    // Scheme, host and port only. Hookbot URLs carry secrets in their path.
    origin: String,
    headers: HeaderMap,
    events: mpsc::Sender<Bytes>,
    errors: mpsc::Sender<SubscriptionError>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let ws_url = match websocket_url(&self.url) {
            Ok(url) => url,
            Err(err) => {
                self.report(err);
                return;
            }
        };

        let mut backoff = INITIAL_BACKOFF;

        loop {
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                connected = self.connect(&ws_url) => connected,
            };

            match connected {
                Ok(stream) => {
                    tracing::info!(origin = %self.origin, "subscribed to event stream");
                    backoff = INITIAL_BACKOFF;
                    match self.pump(stream).await {
                        Disconnect::Cancelled | Disconnect::ReceiverGone => break,
                        Disconnect::Lost(err) => self.report(err),
                    }
                }
                Err(err) => self.report(err),
            }

            tracing::debug!(origin = %self.origin, ?backoff, "reconnecting to event stream");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        tracing::debug!(origin = %self.origin, "subscription worker stopped");
    }

    async fn connect(&self, ws_url: &Url) -> Result<WsStream, SubscriptionError> {
        let connect_error = |source| SubscriptionError::Connect {
            origin: self.origin.clone(),
            source,
        };

        let mut request = ws_url.as_str().into_client_request().map_err(connect_error)?;
        request.headers_mut().extend(self.headers.clone());

        let (stream, _response) = connect_async(request).await.map_err(connect_error)?;
        Ok(stream)
    }

    /// Forwards frames until the connection drops or the worker is told to stop.
    async fn pump(&self, stream: WsStream) -> Disconnect {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Disconnect::Cancelled;
                }
                msg = read.next() => {
                    let payload = match msg {
                        Some(Ok(Message::Binary(data))) => data,
                        Some(Ok(Message::Text(text))) => Bytes::copy_from_slice(text.as_str().as_bytes()),
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(source) = write.send(Message::Pong(data)).await {
                                return Disconnect::Lost(self.stream_error(source));
                            }
                            continue;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Disconnect::Lost(SubscriptionError::Closed(self.origin.clone()));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(source)) => return Disconnect::Lost(self.stream_error(source)),
                    };

                    if self.events.send(payload).await.is_err() {
                        return Disconnect::ReceiverGone;
                    }
                }
            }
        }
    }

    fn stream_error(&self, source: tungstenite::Error) -> SubscriptionError {
        SubscriptionError::Stream {
            origin: self.origin.clone(),
            source,
        }
    }

    /// Errors never hold up event delivery: they are dropped when the
    /// error channel is full or nobody listens.
    fn report(&self, err: SubscriptionError) {
        if let Err(mpsc::error::TrySendError::Full(err)) = self.errors.try_send(err) {
            tracing::debug!(origin = %self.origin, "dropping subscription error: {err}");
        }
    }
}

/// Maps `http(s)` to `ws(s)`; websocket URLs pass through.
fn websocket_url(url: &Url) -> Result<Url, SubscriptionError> {
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(SubscriptionError::UnsupportedScheme(other.to_string())),
    };

    let mut ws_url = url.clone();
    ws_url
        .set_scheme(scheme)
        .map_err(|()| SubscriptionError::UnsupportedScheme(url.scheme().to_string()))?;
    Ok(ws_url)
}

fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}
