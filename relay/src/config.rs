use crate::decoder::{RouteLayout, UnknownRouteLayout};
use crate::history::DEFAULT_CAPACITY;
use crate::message::ChatDefaults;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const SUBSCRIPTION_URL_VAR: &str = "HOOKBOT_LISTEN_URL";
pub const WEBHOOK_URL_VAR: &str = "SLACK_WEBHOOK_URL";
pub const HOST_VAR: &str = "HOST";
pub const PORT_VAR: &str = "PORT";
pub const HISTORY_CAPACITY_VAR: &str = "DINGER_HISTORY_CAPACITY";
pub const ROUTE_LAYOUT_VAR: &str = "DINGER_ROUTE_LAYOUT";
pub const DEFAULT_CHANNEL_VAR: &str = "DINGER_DEFAULT_CHANNEL";
pub const DEFAULT_USERNAME_VAR: &str = "DINGER_DEFAULT_USERNAME";
pub const DEFAULT_ICON_VAR: &str = "DINGER_DEFAULT_ICON";
pub const ANNOUNCE_DINGS_VAR: &str = "DINGER_ANNOUNCE_DINGS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("At least one subscription URL is required")]
    NoSubscriptions,

    #[error("Unsupported subscription URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("History capacity must be at least 1")]
    ZeroCapacity,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),

    #[error("invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("invalid value for DINGER_ROUTE_LAYOUT: {0}")]
    InvalidRouteLayout(#[from] UnknownRouteLayout),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Event streams to subscribe to. Events from all of them are merged.
    pub subscriptions: Vec<Url>,
    /// Chat webhook. When absent, chat forwarding is disabled.
    #[serde(default)]
    pub webhook_url: Option<Url>,
    /// Listener for the HTTP feed
    #[serde(default)]
    pub listener: Listener,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of dings kept for the feed
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// How routed payloads split their route
    pub route_layout: RouteLayout,
    /// Also post plain ding payloads to chat
    pub announce_dings: bool,
    #[serde(flatten)]
    pub defaults: ChatDefaults,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let raw_subscriptions =
            get(SUBSCRIPTION_URL_VAR).ok_or(ConfigError::MissingVar(SUBSCRIPTION_URL_VAR))?;
        let subscriptions = parse_url_list(SUBSCRIPTION_URL_VAR, &raw_subscriptions)?;

        let webhook_url = get(WEBHOOK_URL_VAR)
            .map(|value| parse_url(WEBHOOK_URL_VAR, value.trim()))
            .transpose()?;

        let mut listener = Listener::default();
        if let Some(host) = get(HOST_VAR) {
            listener.host = host;
        }
        if let Some(port) = get(PORT_VAR) {
            listener.port = parse_value(PORT_VAR, &port)?;
        }

        let mut history = HistoryConfig::default();
        if let Some(capacity) = get(HISTORY_CAPACITY_VAR) {
            history.capacity = parse_value(HISTORY_CAPACITY_VAR, &capacity)?;
        }

        let mut chat = ChatConfig::default();
        if let Some(layout) = get(ROUTE_LAYOUT_VAR) {
            chat.route_layout = layout.parse()?;
        }
        if let Some(announce) = get(ANNOUNCE_DINGS_VAR) {
            chat.announce_dings = parse_bool(ANNOUNCE_DINGS_VAR, &announce)?;
        }
        if let Some(channel) = get(DEFAULT_CHANNEL_VAR) {
            chat.defaults.channel = channel;
        }
        if let Some(username) = get(DEFAULT_USERNAME_VAR) {
            chat.defaults.username = username;
        }
        if let Some(icon) = get(DEFAULT_ICON_VAR) {
            chat.defaults.icon_emoji = icon;
        }

        let config = Config {
            subscriptions,
            webhook_url,
            listener,
            history,
            chat,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.subscriptions.is_empty() {
            return Err(ValidationError::NoSubscriptions);
        }

        for url in &self.subscriptions {
            if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
                return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
            }
        }

        if self.history.capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }

        Ok(())
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { var, source })
}

/// Subscription URLs may be separated by commas and/or whitespace.
fn parse_url_list(var: &'static str, value: &str) -> Result<Vec<Url>, ConfigError> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| parse_url(var, part))
        .collect()
}

fn parse_value<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_minimal_env() {
        let config =
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, "https://hookbot.example/sub/x")]))
                .unwrap();

        assert_eq!(config.subscriptions.len(), 1);
        assert_eq!(config.subscriptions[0].host_str(), Some("hookbot.example"));
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.listener, Listener::default());
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.chat.route_layout, RouteLayout::ChannelNameIcon);
        assert!(!config.chat.announce_dings);
        assert_eq!(config.chat.defaults, ChatDefaults::default());
    }

    #[test]
    fn test_full_env() {
        let config = Config::from_lookup(lookup(&[
            (
                SUBSCRIPTION_URL_VAR,
                "https://hookbot.example/sub/a, https://hookbot.example/sub/b",
            ),
            (WEBHOOK_URL_VAR, "https://hooks.slack.example/services/T0"),
            (HOST_VAR, "127.0.0.1"),
            (PORT_VAR, "9090"),
            (HISTORY_CAPACITY_VAR, "3"),
            (ROUTE_LAYOUT_VAR, "3"),
            (ANNOUNCE_DINGS_VAR, "true"),
            (DEFAULT_CHANNEL_VAR, "#dings"),
        ]))
        .unwrap();

        assert_eq!(config.subscriptions.len(), 2);
        assert_eq!(config.subscriptions[1].path(), "/sub/b");
        assert!(config.webhook_url.is_some());
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 9090);
        assert_eq!(config.history.capacity, 3);
        assert_eq!(config.chat.route_layout, RouteLayout::NameIcon);
        assert!(config.chat.announce_dings);
        assert_eq!(config.chat.defaults.channel, "#dings");
        assert_eq!(config.chat.defaults.username, "dinger");
    }

    #[test]
    fn test_missing_subscription_is_error() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::MissingVar(SUBSCRIPTION_URL_VAR))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, "")])),
            Err(ConfigError::MissingVar(SUBSCRIPTION_URL_VAR))
        ));
    }

    #[test]
    fn test_env_errors() {
        let base = "https://hookbot.example/sub/x";

        assert!(matches!(
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, "not a url")])),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, base), (PORT_VAR, "http")])),
            Err(ConfigError::InvalidValue { var: PORT_VAR, .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, base), (PORT_VAR, "0")])),
            Err(ConfigError::Validation(ValidationError::InvalidPort))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[
                (SUBSCRIPTION_URL_VAR, base),
                (HISTORY_CAPACITY_VAR, "0")
            ])),
            Err(ConfigError::Validation(ValidationError::ZeroCapacity))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, base), (ROUTE_LAYOUT_VAR, "5")])),
            Err(ConfigError::InvalidRouteLayout(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[
                (SUBSCRIPTION_URL_VAR, base),
                (ANNOUNCE_DINGS_VAR, "maybe")
            ])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(SUBSCRIPTION_URL_VAR, "ftp://hookbot.example/")])),
            Err(ConfigError::Validation(ValidationError::UnsupportedScheme(_)))
        ));
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r##"
subscriptions:
    - "wss://hookbot.example/sub/dings"
webhook_url: "https://hooks.slack.example/services/T0"
listener:
    host: "127.0.0.1"
    port: 3000
history:
    capacity: 3
chat:
    route_layout: name_icon
    channel: "#alerts"
"##;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.history.capacity, 3);
        assert_eq!(config.chat.route_layout, RouteLayout::NameIcon);
        assert_eq!(config.chat.defaults.channel, "#alerts");
        assert_eq!(config.chat.defaults.icon_emoji, ":broken_heart:");
    }

    #[test]
    fn test_yaml_numeric_route_layout() {
        let yaml = "subscriptions: [\"http://hookbot.example/sub\"]\nchat:\n    route_layout: 3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.chat.route_layout, RouteLayout::NameIcon);
        assert_eq!(config.chat.defaults, ChatDefaults::default());

        let yaml = "subscriptions: [\"http://hookbot.example/sub\"]\nchat:\n    route_layout: 7\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_yaml_defaults() {
        let config: Config =
            serde_yaml::from_str("subscriptions: [\"http://hookbot.example/sub\"]").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.chat, ChatConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let mut config: Config =
            serde_yaml::from_str("subscriptions: [\"http://hookbot.example/sub\"]").unwrap();
        config.subscriptions.clear();
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::NoSubscriptions
        ));
    }
}
