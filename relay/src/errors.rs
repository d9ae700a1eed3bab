use crate::config::{ConfigError, ValidationError};
use std::io;

/// Failures that stop the relay. `main` treats every one of them as fatal.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("subscription stream closed")]
    StreamClosed,
}
