//! Decoding of raw subscription payloads into ding counts or routed chat messages.
//!
//! A payload containing a NUL byte is routed: the bytes before the first NUL are
//! a `/`-separated route and everything after it is the message text. Any other
//! payload is a ding count.

use crate::metrics_defs::DECODE_ANOMALIES;
use serde::Deserialize;
use shared::counter;
use std::str::FromStr;

/// Separates the route from the message text in routed payloads.
pub const ROUTE_SEPARATOR: u8 = 0;

/// Count used for empty and malformed ding payloads.
pub const DEFAULT_DING_COUNT: u64 = 1;

/// How the route in front of a routed payload is split.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RouteLayoutRepr")]
pub enum RouteLayout {
    /// `domain/name/icon`
    NameIcon,
    /// `domain/channel/name/icon`
    #[default]
    ChannelNameIcon,
}

/// Config files may name the layout or give its segment count as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RouteLayoutRepr {
    Segments(u64),
    Name(String),
}

impl TryFrom<RouteLayoutRepr> for RouteLayout {
    type Error = UnknownRouteLayout;

    fn try_from(repr: RouteLayoutRepr) -> Result<Self, Self::Error> {
        match repr {
            RouteLayoutRepr::Segments(segments) => segments.to_string().parse(),
            RouteLayoutRepr::Name(name) => name.parse(),
        }
    }
}

impl RouteLayout {
    /// Number of `/`-separated segments, the leading domain included.
    pub const fn segments(self) -> usize {
        match self {
            RouteLayout::NameIcon => 3,
            RouteLayout::ChannelNameIcon => 4,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown route layout {0:?}, expected 3, 4, name_icon or channel_name_icon")]
pub struct UnknownRouteLayout(pub String);

impl FromStr for RouteLayout {
    type Err = UnknownRouteLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "3" | "name_icon" => Ok(RouteLayout::NameIcon),
            "4" | "channel_name_icon" => Ok(RouteLayout::ChannelNameIcon),
            other => Err(UnknownRouteLayout(other.to_string())),
        }
    }
}

/// Chat metadata carried by a routed payload. Missing fields are filled in
/// from the configured defaults when the envelope is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutedMessage {
    pub channel: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedEvent {
    DingCount(u64),
    RoutedMessage(RoutedMessage),
}

/// A ding payload that did not hold a usable count.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DecodeAnomaly {
    #[error("event data not a number: {0:?}")]
    NotANumber(String),
    #[error("negative ding count: {0}")]
    Negative(String),
}

impl DecodeAnomaly {
    /// Count recorded in place of the malformed one.
    pub const fn fallback_count(&self) -> u64 {
        match self {
            DecodeAnomaly::NotANumber(_) => DEFAULT_DING_COUNT,
            DecodeAnomaly::Negative(_) => 0,
        }
    }
}

/// Decodes a payload. Never fails: malformed counts are logged and replaced
/// by their fallback.
pub fn decode(payload: &[u8], layout: RouteLayout) -> DecodedEvent {
    if let Some(idx) = payload.iter().position(|&b| b == ROUTE_SEPARATOR) {
        let (route, text) = (&payload[..idx], &payload[idx + 1..]);
        return DecodedEvent::RoutedMessage(decode_routed(route, text, layout));
    }

    let count = parse_ding_count(payload).unwrap_or_else(|anomaly| {
        tracing::warn!("{anomaly}");
        counter!(DECODE_ANOMALIES).increment(1);
        anomaly.fallback_count()
    });
    DecodedEvent::DingCount(count)
}

/// Reads the leading whitespace-separated token of `payload` as a ding count.
/// An empty payload is a single ding.
pub fn parse_ding_count(payload: &[u8]) -> Result<u64, DecodeAnomaly> {
    if payload.is_empty() {
        return Ok(DEFAULT_DING_COUNT);
    }

    let text = String::from_utf8_lossy(payload);
    let Some(token) = text.split_whitespace().next() else {
        return Err(DecodeAnomaly::NotANumber(text.into_owned()));
    };

    let (negative, digits) = match token.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeAnomaly::NotANumber(text.into_owned()));
    }

    if negative {
        if digits.bytes().all(|b| b == b'0') {
            return Ok(0);
        }
        return Err(DecodeAnomaly::Negative(token.to_string()));
    }

    // Only overflow can fail here. Counts past capacity are truncated anyway.
    Ok(digits.parse().unwrap_or(u64::MAX))
}

fn decode_routed(route: &[u8], text: &[u8], layout: RouteLayout) -> RoutedMessage {
    let route = String::from_utf8_lossy(route);
    let mut parts = route.splitn(layout.segments(), '/');

    // The leading domain segment is reserved.
    let _domain = parts.next();

    let mut field = || {
        parts
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
    };

    let (channel, name, icon) = match layout {
        RouteLayout::NameIcon => (None, field(), field()),
        RouteLayout::ChannelNameIcon => (field(), field(), field()),
    };

    RoutedMessage {
        channel,
        name,
        icon,
        text: String::from_utf8_lossy(text).into_owned(),
    }
}
