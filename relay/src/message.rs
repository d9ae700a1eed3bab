use crate::decoder::RoutedMessage;
use serde::{Deserialize, Serialize};

pub const DEFAULT_USERNAME: &str = "dinger";
pub const DEFAULT_ICON: &str = ":broken_heart:";
pub const DEFAULT_CHANNEL: &str = "#log";

/// JSON envelope accepted by the chat webhook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
    pub channel: String,
}

/// Envelope fields used when a payload does not carry its own.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatDefaults {
    pub username: String,
    pub icon_emoji: String,
    pub channel: String,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        ChatDefaults {
            username: DEFAULT_USERNAME.into(),
            icon_emoji: DEFAULT_ICON.into(),
            channel: DEFAULT_CHANNEL.into(),
        }
    }
}

impl ChatMessage {
    pub fn with_defaults(text: impl Into<String>, defaults: &ChatDefaults) -> Self {
        ChatMessage {
            text: text.into(),
            username: defaults.username.clone(),
            icon_emoji: defaults.icon_emoji.clone(),
            channel: defaults.channel.clone(),
        }
    }

    pub fn from_routed(routed: RoutedMessage, defaults: &ChatDefaults) -> Self {
        ChatMessage {
            text: routed.text,
            username: routed.name.unwrap_or_else(|| defaults.username.clone()),
            icon_emoji: routed.icon.unwrap_or_else(|| defaults.icon_emoji.clone()),
            channel: routed.channel.unwrap_or_else(|| defaults.channel.clone()),
        }
    }
}
