//! Errors raised while assembling transports and loggers.

use std::io;

use thiserror::Error;

use crate::limits::LimitsError;

/// Errors that may occur while building a transport or logger.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Entry limits that the wire format cannot honour.
    #[error(transparent)]
    Limits(#[from] LimitsError),
    /// Key, certificate or CA material was rejected.
    #[error("invalid TLS material: {0}")]
    Tls(#[from] native_tls::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
