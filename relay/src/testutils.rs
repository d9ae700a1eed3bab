use crate::forwarder::{Forward, ForwardError};
use crate::message::ChatMessage;
use async_trait::async_trait;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Forwarder double that counts calls and hands every message to the test
/// through a channel, so spawned deliveries can be awaited.
pub struct RecordingForwarder {
    calls: AtomicUsize,
    fail: bool,
    enabled: bool,
    delivered: mpsc::UnboundedSender<ChatMessage>,
}

impl RecordingForwarder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ChatMessage>) {
        Self::build(false, true)
    }

    /// Records like `new`, but reports every delivery as failed.
    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<ChatMessage>) {
        Self::build(true, true)
    }

    /// Stands in for a forwarder with nowhere to deliver to.
    pub fn disabled() -> (Arc<Self>, mpsc::UnboundedReceiver<ChatMessage>) {
        Self::build(false, false)
    }

    fn build(fail: bool, enabled: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<ChatMessage>) {
        let (delivered, rx) = mpsc::unbounded_channel();
        let forwarder = RecordingForwarder {
            calls: AtomicUsize::new(0),
            fail,
            enabled,
            delivered,
        };
        (Arc::new(forwarder), rx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Forward for RecordingForwarder {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn forward(&self, message: ChatMessage) -> Result<(), ForwardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.delivered.send(message);

        if self.fail {
            return Err(ForwardError::DeliveryFailed("test failure".into()));
        }
        Ok(())
    }
}

/// Metrics recorder that keeps counter totals by name. Install it with
/// `metrics::with_local_recorder`; gauges and histograms are discarded.
#[derive(Default)]
pub struct CountingRecorder {
    counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
}

impl CountingRecorder {
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .get(name)
            .map_or(0, |value| value.load(Ordering::SeqCst))
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let value = self
            .counters
            .lock()
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Counter::from_arc(value)
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
