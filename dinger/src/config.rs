use relay::config::{Config as RelayConfig, ConfigError as RelayConfigError, ValidationError};
use serde::Deserialize;
use std::fs::File;

pub const STATSD_HOST_VAR: &str = "STATSD_HOST";
pub const STATSD_PORT_VAR: &str = "STATSD_PORT";
pub const SENTRY_DSN_VAR: &str = "SENTRY_DSN";

const DEFAULT_STATSD_PORT: u16 = 8125;

fn default_statsd_port() -> u16 {
    DEFAULT_STATSD_PORT
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    #[serde(default = "default_statsd_port")]
    pub statsd_port: u16,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub relay: RelayConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.relay.validate()?;

        Ok(data)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relay = RelayConfig::from_lookup(&lookup)?;
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let metrics = match get(STATSD_HOST_VAR) {
            Some(statsd_host) => {
                let statsd_port = match get(STATSD_PORT_VAR) {
                    Some(port) => port
                        .parse()
                        .map_err(|_| ConfigError::InvalidStatsdPort(port))?,
                    None => DEFAULT_STATSD_PORT,
                };
                Some(MetricsConfig {
                    statsd_host,
                    statsd_port,
                })
            }
            None => None,
        };

        let logging = get(SENTRY_DSN_VAR).map(|sentry_dsn| LoggingConfig { sentry_dsn });

        Ok(Config {
            common: CommonConfig { metrics, logging },
            relay,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error(transparent)]
    Relay(#[from] RelayConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid value for STATSD_PORT: {0:?}")]
    InvalidStatsdPort(String),
}
