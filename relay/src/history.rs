//! Bounded, most-recent-first record of ding timestamps.

use crate::metrics_defs::{DINGS_RECORDED, HISTORY_SIZE};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::{counter, gauge};
use std::collections::VecDeque;
use std::sync::Arc;

pub type Timestamp = DateTime<Utc>;

pub const DEFAULT_CAPACITY: usize = 10;

/// Cloning shares the underlying history. Recording and snapshotting both go
/// through one mutex, so a snapshot never observes a half-applied record.
#[derive(Clone, Debug)]
pub struct DingHistory {
    entries: Arc<Mutex<VecDeque<Timestamp>>>,
    capacity: usize,
}

impl DingHistory {
    /// `capacity` must be at least 1; config validation enforces this.
    pub fn new(capacity: usize) -> Self {
        DingHistory {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepends `count` copies of `now`, then drops the oldest entries beyond
    /// capacity. Both steps happen under the same lock.
    pub fn record(&self, now: Timestamp, count: u64) {
        self.record_with(|| now, count);
    }

    /// Like `record`, but reads the clock while holding the lock so entries
    /// stay in descending order even with concurrent writers.
    pub fn record_now(&self, count: u64) {
        self.record_with(Utc::now, count);
    }

    fn record_with(&self, now: impl FnOnce() -> Timestamp, count: u64) {
        // Anything past `capacity` copies would be truncated straight away.
        let copies = usize::try_from(count).map_or(self.capacity, |c| c.min(self.capacity));

        let len = {
            let mut entries = self.entries.lock();
            let now = now();
            for _ in 0..copies {
                entries.push_front(now);
            }
            entries.truncate(self.capacity);
            entries.len()
        };

        if count > 0 {
            tracing::info!(count, "Ding!");
            counter!(DINGS_RECORDED).increment(count);
        }
        gauge!(HISTORY_SIZE).set(len as f64);
    }

    /// Current entries, most recent first.
    pub fn snapshot(&self) -> Vec<Timestamp> {
        self.entries.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DingHistory {
    fn default() -> Self {
        DingHistory::new(DEFAULT_CAPACITY)
    }
}
