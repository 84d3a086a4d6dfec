//! Caller-facing logger.
//!
//! A [`FemtoLogger`] pairs an [`EntryBuilder`] with a [`FemtoTransport`].
//! Each severity method classifies its arguments, hands the entry to the
//! transport and returns the rendered identifier without waiting for
//! delivery.

use std::{sync::Arc, time::Duration};

use crate::{
    entry::EntryBuilder,
    error::BuildError,
    level::FemtoLevel,
    limits::EntryLimits,
    log_arg::LogArg,
    trace::FrameFilter,
    transport::{Connector, FemtoTransport, TransportBuilder, TransportObserver},
    xid::Xid,
};

/// Default entry TTL applied when a call carries no override.
pub const DEFAULT_ENTRY_TTL: u16 = 30;
/// Default metadata TTL applied when a call carries no override.
pub const DEFAULT_META_TTL: u16 = 30;

macro_rules! severity_methods {
    ($($(#[$meta:meta])* $name:ident => $level:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name<I>(&self, args: I) -> String
            where
                I: IntoIterator<Item = LogArg>,
            {
                self.log(FemtoLevel::$level, args).to_string()
            }
        )+
    };
}

/// Structured logger bound to one bucket and one collector connection.
#[derive(Debug)]
pub struct FemtoLogger {
    entries: EntryBuilder,
    transport: FemtoTransport,
}

impl FemtoLogger {
    /// Build an entry at `level` from `args` and hand it to the transport.
    pub fn log<I>(&self, level: FemtoLevel, args: I) -> Xid
    where
        I: IntoIterator<Item = LogArg>,
    {
        let entry = self.entries.build(level, args);
        self.transport.write(&entry)
    }

    severity_methods! {
        /// Log at severity 0, system unusable.
        emerg => Emergency,
        alert => Alert,
        crit => Critical,
        err => Error,
        warning => Warning,
        notice => Notice,
        /// Log at severity 6.
        ///
        /// ```rust,ignore
        /// let id = logger.info(["order %d created".into(), 123456.into()]);
        /// assert_eq!(id.len(), femtowire::XID_TEXT_LEN);
        /// ```
        info => Info,
        debug => Debug,
    }

    pub fn bucket_id(&self) -> u32 {
        self.entries.bucket_id()
    }

    pub fn limits(&self) -> &EntryLimits {
        self.entries.limits()
    }

    /// Wait for queued entries to reach an open connection.
    ///
    /// See [`FemtoTransport::flush`].
    pub fn flush(&self, timeout: Duration) -> bool {
        self.transport.flush(timeout)
    }

    /// Close the transport. Entries logged afterwards are dropped, but still
    /// receive identifiers.
    pub fn close(&mut self) {
        self.transport.close();
    }
}

/// Builder for [`FemtoLogger`].
#[derive(Clone, Debug, Default)]
pub struct LoggerBuilder {
    bucket_id: u32,
    entry_ttl: Option<u16>,
    meta_ttl: Option<u16>,
    limits: EntryLimits,
    frame_filter: Option<FrameFilter>,
    transport: TransportBuilder,
}

impl LoggerBuilder {
    pub fn new(bucket_id: u32) -> Self {
        Self {
            bucket_id,
            ..Self::default()
        }
    }

    /// Default TTLs for entries and their metadata.
    pub fn with_ttls(mut self, entry_ttl: u16, meta_ttl: u16) -> Self {
        self.entry_ttl = Some(entry_ttl);
        self.meta_ttl = Some(meta_ttl);
        self
    }

    /// Size and count caps; `max_entry_size` also bounds the transport.
    pub fn with_limits(mut self, limits: EntryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_frame_filter(mut self, filter: FrameFilter) -> Self {
        self.frame_filter = Some(filter);
        self
    }

    /// Collector connection settings.
    pub fn with_transport(mut self, transport: TransportBuilder) -> Self {
        self.transport = transport;
        self
    }

    /// Shorthand for replacing the transport observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransportObserver>) -> Self {
        self.transport = self.transport.with_observer(observer);
        self
    }

    /// Validate the limits and connect through mutual TLS.
    pub fn build(&self) -> Result<FemtoLogger, BuildError> {
        let entries = self.entry_builder()?;
        let transport = self.transport_builder().build()?;
        Ok(FemtoLogger { entries, transport })
    }

    /// Validate the limits and connect through `connector`.
    pub fn build_with_connector<C: Connector>(
        &self,
        connector: C,
    ) -> Result<FemtoLogger, BuildError> {
        let entries = self.entry_builder()?;
        let transport = self.transport_builder().build_with_connector(connector)?;
        Ok(FemtoLogger { entries, transport })
    }

    fn entry_builder(&self) -> Result<EntryBuilder, BuildError> {
        self.limits.validate()?;
        let builder = EntryBuilder::new(
            self.bucket_id,
            self.entry_ttl.unwrap_or(DEFAULT_ENTRY_TTL),
            self.meta_ttl.unwrap_or(DEFAULT_META_TTL),
            self.limits.clone(),
        );
        Ok(match &self.frame_filter {
            Some(filter) => builder.with_frame_filter(filter.clone()),
            None => builder,
        })
    }

    fn transport_builder(&self) -> TransportBuilder {
        self.transport
            .clone()
            .with_max_entry_size(self.limits.max_entry_size)
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
