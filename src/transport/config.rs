//! Configuration consumed by the transport worker.
//!
//! [`TransportBuilder`](super::TransportBuilder) assembles these values
//! before handing them to [`FemtoTransport`](super::FemtoTransport).

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default bounded channel capacity between callers and the worker.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default timeout for TCP connect and the TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout applied to each socket write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default interval between peer-close checks while idle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Default largest wire message accepted for sending.
pub const DEFAULT_MAX_ENTRY_SIZE: usize = u16::MAX as usize;
/// Default base delay for exponential reconnect backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default maximum reconnect delay.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);
/// Default duration of healthy operation that resets the backoff.
pub const DEFAULT_BACKOFF_RESET: Duration = Duration::from_secs(30);
/// Default time `close` waits for the worker to acknowledge shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Runtime settings for one transport.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub capacity: usize,
    pub poll_interval: Duration,
    pub max_entry_size: usize,
    pub backoff: BackoffPolicy,
    pub warn_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            backoff: BackoffPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Exponential backoff policy for reconnect attempts after a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub reset_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
            reset_after: DEFAULT_BACKOFF_RESET,
        }
    }
}
