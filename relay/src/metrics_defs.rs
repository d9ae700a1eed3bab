//! Metrics definitions for the relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const EVENTS_RECEIVED: MetricDef = MetricDef {
    name: "events.received",
    metric_type: MetricType::Counter,
    description: "Number of payloads received from the subscription stream",
};

pub const DECODE_ANOMALIES: MetricDef = MetricDef {
    name: "events.decode_anomaly",
    metric_type: MetricType::Counter,
    description: "Number of ding payloads that did not hold a usable count",
};

pub const DINGS_RECORDED: MetricDef = MetricDef {
    name: "dings.recorded",
    metric_type: MetricType::Counter,
    description: "Number of ding units recorded in the history",
};

pub const HISTORY_SIZE: MetricDef = MetricDef {
    name: "history.size",
    metric_type: MetricType::Gauge,
    description: "Number of entries currently held in the ding history",
};

pub const FORWARD_DELIVERED: MetricDef = MetricDef {
    name: "forward.delivered",
    metric_type: MetricType::Counter,
    description: "Number of chat messages accepted by the webhook",
};

pub const FORWARD_FAILED: MetricDef = MetricDef {
    name: "forward.failed",
    metric_type: MetricType::Counter,
    description: "Number of chat messages the webhook did not accept",
};

pub const STREAM_ERRORS: MetricDef = MetricDef {
    name: "subscription.errors",
    metric_type: MetricType::Counter,
    description: "Number of errors reported by the subscription stream",
};

pub const ALL_METRICS: &[MetricDef] = &[
    EVENTS_RECEIVED,
    DECODE_ANOMALIES,
    DINGS_RECORDED,
    HISTORY_SIZE,
    FORWARD_DELIVERED,
    FORWARD_FAILED,
    STREAM_ERRORS,
];
