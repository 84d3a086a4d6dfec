//! Observability sink for connection events.
//!
//! Transport failures never reach the caller of `write`; they are reported
//! here instead. [`LogObserver`] forwards every event to the `log` facade and
//! is installed unless the builder is given another observer.

use std::io;

use log::{debug, info, warn};
use thiserror::Error;

/// Failures reported by the transport worker.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(io::Error),
    #[error("failed to write: {0}")]
    Write(io::Error),
}

/// Why a connection left the open or connecting state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the stream cleanly; pending writes are kept.
    Graceful,
    /// Connect or write failure; pending writes were dropped.
    Error,
    /// The transport was closed by its owner.
    Shutdown,
}

/// Receives connection lifecycle events from the worker thread.
pub trait TransportObserver: Send + Sync {
    fn connecting(&self) {}
    fn opened(&self) {}
    /// `dropped` counts queued writes discarded by this close.
    fn closed(&self, _reason: CloseReason, _dropped: usize) {}
    fn error(&self, _err: &TransportError) {}
}

/// Observer that writes events through the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl TransportObserver for LogObserver {
    fn connecting(&self) {
        debug!("femtowire transport connecting");
    }

    fn opened(&self) {
        info!("femtowire transport connected");
    }

    fn closed(&self, reason: CloseReason, dropped: usize) {
        match (reason, dropped) {
            (CloseReason::Graceful, _) => info!("femtowire transport closed by peer"),
            (_, 0) => debug!("femtowire transport closed ({reason:?})"),
            (_, n) => warn!("femtowire transport closed ({reason:?}); dropped {n} pending entries"),
        }
    }

    fn error(&self, err: &TransportError) {
        warn!("femtowire transport error: {err}");
    }
}

/// Observer that emits `tracing` events.
#[cfg(feature = "tracing-observer")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

#[cfg(feature = "tracing-observer")]
impl TransportObserver for TracingObserver {
    fn connecting(&self) {
        tracing::debug!(target: "femtowire::transport", "connecting");
    }

    fn opened(&self) {
        tracing::info!(target: "femtowire::transport", "connected");
    }

    fn closed(&self, reason: CloseReason, dropped: usize) {
        tracing::info!(target: "femtowire::transport", ?reason, dropped, "closed");
    }

    fn error(&self, err: &TransportError) {
        tracing::warn!(target: "femtowire::transport", error = %err, "transport error");
    }
}
