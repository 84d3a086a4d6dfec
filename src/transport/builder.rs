//! Builder for [`FemtoTransport`](super::FemtoTransport).
//!
//! Collects the collector address, TLS material, timeouts and backoff
//! parameters, validates them, and starts the worker.

use std::{sync::Arc, time::Duration};

use crate::{error::BuildError, wire::HEADER_LEN};

use super::{
    FemtoTransport,
    config::{BackoffPolicy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_WRITE_TIMEOUT, TransportConfig},
    connection::{Connector, TlsConnector, TlsMaterial},
    observer::{LogObserver, TransportObserver},
};

/// Overrides for the reconnect backoff timings.
#[derive(Clone, Debug, Default)]
pub struct BackoffOverrides {
    base_ms: Option<u64>,
    cap_ms: Option<u64>,
    reset_after_ms: Option<u64>,
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

impl BackoffOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the base delay in milliseconds.
    pub fn with_base_ms(mut self, base_ms: u64) -> Self {
        self.base_ms = Some(base_ms);
        self
    }

    /// Override the maximum delay in milliseconds.
    pub fn with_cap_ms(mut self, cap_ms: u64) -> Self {
        self.cap_ms = Some(cap_ms);
        self
    }

    /// Override how long a connection must stay healthy before the backoff
    /// starts again from the base delay.
    pub fn with_reset_after_ms(mut self, reset_after_ms: u64) -> Self {
        self.reset_after_ms = Some(reset_after_ms);
        self
    }

    fn apply(&self, policy: &mut BackoffPolicy) -> Result<(), BuildError> {
        if let Some(base) = self.base_ms {
            policy.base = Duration::from_millis(ensure_positive!(base, "backoff_base_ms")?);
        }
        if let Some(cap) = self.cap_ms {
            policy.cap = Duration::from_millis(ensure_positive!(cap, "backoff_cap_ms")?);
        }
        if let Some(reset) = self.reset_after_ms {
            policy.reset_after =
                Duration::from_millis(ensure_positive!(reset, "backoff_reset_after_ms")?);
        }
        if policy.base > policy.cap {
            return Err(BuildError::InvalidConfig(
                "backoff_base_ms must not exceed backoff_cap_ms".into(),
            ));
        }
        Ok(())
    }
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

#[derive(Clone, Debug)]
struct Endpoint {
    host: String,
    port: u16,
}

/// Builder for constructing [`FemtoTransport`] instances.
#[derive(Clone, Default)]
pub struct TransportBuilder {
    endpoint: Option<Endpoint>,
    tls: Option<TlsMaterial>,
    capacity: Option<usize>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    shutdown_timeout_ms: Option<u64>,
    max_entry_size: Option<usize>,
    backoff: BackoffOverrides,
    observer: Option<Arc<dyn TransportObserver>>,
}

impl TransportBuilder {
    /// Create a builder with no collector configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Address of the collector.
    pub fn with_tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.endpoint = Some(Endpoint {
            host: host.into(),
            port,
        });
        self
    }

    /// Client identity and CA bundle for mutual TLS.
    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = Some(tls);
        self
    }

    option_setter!(
        #[doc = "Set the channel capacity, which also caps writes queued while connecting."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_write_timeout_ms, write_timeout_ms, u64);
    option_setter!(
        #[doc = "Set how often an open connection is checked for a peer close."]
        with_poll_interval_ms,
        poll_interval_ms,
        u64
    );
    option_setter!(with_shutdown_timeout_ms, shutdown_timeout_ms, u64);
    option_setter!(
        #[doc = "Set the largest encoded entry, in bytes, that will be sent."]
        with_max_entry_size,
        max_entry_size,
        usize
    );

    /// Override backoff timings using the provided overrides.
    pub fn with_backoff(mut self, overrides: BackoffOverrides) -> Self {
        self.backoff = overrides;
        self
    }

    /// Replace the default [`LogObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn TransportObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate the settings and start a mutually authenticated TLS transport.
    pub fn build(&self) -> Result<FemtoTransport, BuildError> {
        let config = self.build_config()?;
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            BuildError::InvalidConfig("transport requires a collector address".into())
        })?;
        let tls = self.tls.as_ref().ok_or_else(|| {
            BuildError::InvalidConfig("transport requires TLS material".into())
        })?;
        let connector = TlsConnector::new(
            endpoint.host.clone(),
            endpoint.port,
            tls,
            self.connect_timeout()?,
            self.write_timeout()?,
        )?;
        FemtoTransport::with_connector(config, connector, self.observer())
    }

    /// Validate the settings and start a transport over a custom connector.
    ///
    /// The address, TLS material and socket timeouts are ignored; the
    /// connector is responsible for them.
    pub fn build_with_connector<C: Connector>(
        &self,
        connector: C,
    ) -> Result<FemtoTransport, BuildError> {
        let config = self.build_config()?;
        FemtoTransport::with_connector(config, connector, self.observer())
    }

    fn build_config(&self) -> Result<TransportConfig, BuildError> {
        let mut config = TransportConfig::default();
        if let Some(capacity) = self.capacity {
            config.capacity = ensure_positive!(capacity, "capacity")?;
        }
        if let Some(poll) = self.poll_interval_ms {
            config.poll_interval =
                Duration::from_millis(ensure_positive!(poll, "poll_interval_ms")?);
        }
        if let Some(timeout) = self.shutdown_timeout_ms {
            config.shutdown_timeout =
                Duration::from_millis(ensure_positive!(timeout, "shutdown_timeout_ms")?);
        }
        if let Some(size) = self.max_entry_size {
            if !(HEADER_LEN..=usize::from(u16::MAX)).contains(&size) {
                return Err(BuildError::InvalidConfig(format!(
                    "max_entry_size must be between {HEADER_LEN} and {}",
                    u16::MAX
                )));
            }
            config.max_entry_size = size;
        }
        self.backoff.apply(&mut config.backoff)?;
        Ok(config)
    }

    fn connect_timeout(&self) -> Result<Duration, BuildError> {
        self.connect_timeout_ms
            .map(|ms| ensure_positive!(ms, "connect_timeout_ms").map(Duration::from_millis))
            .transpose()
            .map(|timeout| timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
    }

    fn write_timeout(&self) -> Result<Duration, BuildError> {
        self.write_timeout_ms
            .map(|ms| ensure_positive!(ms, "write_timeout_ms").map(Duration::from_millis))
            .transpose()
            .map(|timeout| timeout.unwrap_or(DEFAULT_WRITE_TIMEOUT))
    }

    fn observer(&self) -> Arc<dyn TransportObserver> {
        self.observer
            .clone()
            .unwrap_or_else(|| Arc::new(LogObserver))
    }

    /// Largest encoded entry the built transport will accept.
    pub fn max_entry_size(&self) -> usize {
        self.max_entry_size
            .unwrap_or_else(|| TransportConfig::default().max_entry_size)
    }
}

impl std::fmt::Debug for TransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportBuilder")
            .field("endpoint", &self.endpoint)
            .field("tls", &self.tls)
            .field("capacity", &self.capacity)
            .field("max_entry_size", &self.max_entry_size)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
