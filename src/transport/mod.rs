//! Resilient transport to the remote collector.
//!
//! [`FemtoTransport`] stamps each entry with an identifier, encodes it on the
//! caller's thread and hands the bytes to a worker thread that owns the
//! single connection. The worker connects lazily on the first write, queues
//! writes while a connect is in flight, drains the queue once the connection
//! opens, and drops back to absent when the connection fails or the peer
//! closes it. Callers always get the identifier back immediately; delivery is
//! best-effort and at-most-once.

mod backoff;
mod builder;
mod config;
mod connection;
mod observer;
mod state;
mod worker;


use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{Sender, TrySendError, bounded};
use log::warn;
use parking_lot::Mutex;

use crate::{
    entry::FemtoEntry,
    error::BuildError,
    rate_limited_warner::RateLimitedWarner,
    wire,
    xid::{Xid, XidGenerator},
};

pub use builder::{BackoffOverrides, TransportBuilder};
pub use config::{BackoffPolicy, TransportConfig};
pub use connection::{
    Connection, Connector, TlsConnection, TlsConnector, TlsMaterial, connect_tcp, tcp_peer_closed,
};
#[cfg(feature = "tracing-observer")]
pub use observer::TracingObserver;
pub use observer::{CloseReason, LogObserver, TransportError, TransportObserver};

use worker::{TransportCommand, spawn_worker};

fn warn_queue_full(count: u64) {
    warn!("femtowire transport queue full; dropped {count} entries");
}

/// Warners for the ways a write can be dropped before reaching the collector.
struct DropWarners {
    /// Shared with the worker, which drops writes once its pending queue is
    /// full.
    queue_full: Arc<RateLimitedWarner>,
    closed: RateLimitedWarner,
    encode: RateLimitedWarner,
}

/// Handle to the transport worker.
pub struct FemtoTransport {
    tx: Option<Sender<TransportCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    ids: XidGenerator,
    max_entry_size: usize,
    shutdown_timeout: Duration,
    warners: DropWarners,
}

impl FemtoTransport {
    /// Start a worker that opens connections through `connector`.
    pub fn with_connector<C: Connector>(
        config: TransportConfig,
        connector: C,
        observer: Arc<dyn TransportObserver>,
    ) -> Result<Self, BuildError> {
        let max_entry_size = config.max_entry_size;
        let shutdown_timeout = config.shutdown_timeout;
        let warners = DropWarners {
            queue_full: Arc::new(RateLimitedWarner::new(config.warn_interval)),
            closed: RateLimitedWarner::new(config.warn_interval),
            encode: RateLimitedWarner::new(config.warn_interval),
        };
        let (tx, handle) = spawn_worker(
            config,
            connector,
            observer,
            Arc::clone(&warners.queue_full),
        )?;
        Ok(Self {
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            ids: XidGenerator::new(),
            max_entry_size,
            shutdown_timeout,
            warners,
        })
    }

    /// Identifier state owned by this transport.
    pub fn ids(&self) -> &XidGenerator {
        &self.ids
    }

    /// Stamp, encode and enqueue `entry`, returning its identifier.
    ///
    /// Never blocks and never fails: when the entry cannot be encoded, the
    /// queue is full or the transport is closed, the entry is dropped with a
    /// rate-limited warning and the identifier is still returned.
    pub fn write(&self, entry: &FemtoEntry) -> Xid {
        let xid = self.ids.next();
        let frame = match wire::encode(entry, entry.bucket_id, &xid, self.max_entry_size) {
            Ok(frame) => frame,
            Err(err) => {
                self.warners.encode.record_drop();
                self.warners.encode.warn_if_due(|count| {
                    warn!("femtowire dropped {count} entries that failed to encode: {err}");
                });
                return xid;
            }
        };
        let Some(tx) = self.tx.as_ref() else {
            self.record_closed_drop();
            return xid;
        };
        match tx.try_send(TransportCommand::Send(frame)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.warners.queue_full.record_drop();
                self.warners.queue_full.warn_if_due(warn_queue_full);
            }
            Err(TrySendError::Disconnected(_)) => self.record_closed_drop(),
        }
        xid
    }

    /// Wait until the worker has handled every earlier write and no connect
    /// attempt is in flight.
    ///
    /// Returns `true` when the connection is open at that point, `false` when
    /// it is not, the transport is closed, or `timeout` elapses. Pending
    /// queue-full drops are reported before returning.
    pub fn flush(&self, timeout: Duration) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        let (ack_tx, ack_rx) = bounded(1);
        let open = tx
            .send_timeout(TransportCommand::Flush(ack_tx), timeout)
            .is_ok()
            && ack_rx.recv_timeout(timeout).unwrap_or(false);
        self.warners.queue_full.flush(warn_queue_full);
        open
    }

    /// Stop reconnecting, tear down the connection and join the worker.
    ///
    /// Entries still queued are discarded. Later writes are dropped.
    pub fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            let (ack_tx, ack_rx) = bounded(1);
            if tx.send(TransportCommand::Shutdown(ack_tx)).is_ok() {
                let _ = ack_rx.recv_timeout(self.shutdown_timeout);
            }
        }
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("femtowire transport worker panicked");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    fn record_closed_drop(&self) {
        self.warners.closed.record_drop();
        self.warners.closed.warn_if_due(|count| {
            warn!("femtowire transport closed; dropped {count} entries");
        });
    }
}

impl Drop for FemtoTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FemtoTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FemtoTransport")
            .field("closed", &self.is_closed())
            .field("max_entry_size", &self.max_entry_size)
            .finish_non_exhaustive()
    }
}
