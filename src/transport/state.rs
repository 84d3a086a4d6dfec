//! Connection state machine driven by the worker.
//!
//! The machine owns the connection and the pending queue. It performs sends
//! itself but never connects; instead it returns [`Next::Connect`] and the
//! worker starts an attempt whose outcome comes back through
//! [`ConnectionMachine::on_connected`] or
//! [`ConnectionMachine::on_connect_failed`].
//!
//! On open the whole pending queue is drained in FIFO order. The queue holds
//! at most `max_pending` frames; writes beyond that are dropped and counted.

use std::{collections::VecDeque, io, sync::Arc};

use super::{
    connection::Connection,
    observer::{CloseReason, TransportError, TransportObserver},
};

/// Follow-up the worker must perform after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum Next {
    Idle,
    Connect,
}

/// Observable connection phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Absent,
    Connecting,
    Open,
}

enum ConnectionState<C> {
    Absent,
    Connecting,
    Open(C),
}

pub struct ConnectionMachine<C: Connection> {
    state: ConnectionState<C>,
    pending: VecDeque<Vec<u8>>,
    max_pending: usize,
    overflowed: u64,
    reconnect: bool,
    failures: u32,
    observer: Arc<dyn TransportObserver>,
}

impl<C: Connection> ConnectionMachine<C> {
    pub fn new(observer: Arc<dyn TransportObserver>, max_pending: usize) -> Self {
        Self {
            state: ConnectionState::Absent,
            pending: VecDeque::new(),
            max_pending,
            overflowed: 0,
            reconnect: true,
            failures: 0,
            observer,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            ConnectionState::Absent => Phase::Absent,
            ConnectionState::Connecting => Phase::Connecting,
            ConnectionState::Open(_) => Phase::Open,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Frames dropped because the queue was full, since the last call.
    pub fn take_overflowed(&mut self) -> u64 {
        std::mem::take(&mut self.overflowed)
    }

    /// Consecutive failed connects or writes since the last successful open.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Send a frame now if open, otherwise queue it and connect if needed.
    pub fn on_send(&mut self, frame: Vec<u8>) -> Next {
        match &mut self.state {
            ConnectionState::Open(conn) => {
                if let Err(err) = conn.send(&frame) {
                    self.fail(TransportError::Write(err), 1);
                }
                Next::Idle
            }
            ConnectionState::Connecting => {
                self.enqueue(frame);
                Next::Idle
            }
            ConnectionState::Absent => {
                if !self.reconnect {
                    self.observer.closed(CloseReason::Shutdown, 1);
                    return Next::Idle;
                }
                self.enqueue(frame);
                self.begin_connect()
            }
        }
    }

    /// Adopt a freshly opened connection and flush the pending queue.
    pub fn on_connected(&mut self, mut conn: C) -> Next {
        if !matches!(self.state, ConnectionState::Connecting) || !self.reconnect {
            conn.shutdown();
            return Next::Idle;
        }
        self.failures = 0;
        self.observer.opened();
        while let Some(frame) = self.pending.pop_front() {
            if let Err(err) = conn.send(&frame) {
                conn.shutdown();
                let dropped = 1 + self.pending.len();
                self.fail(TransportError::Write(err), dropped);
                return Next::Idle;
            }
        }
        self.state = ConnectionState::Open(conn);
        Next::Idle
    }

    /// A connect attempt failed; queued writes are discarded.
    pub fn on_connect_failed(&mut self, err: io::Error) -> Next {
        if matches!(self.state, ConnectionState::Connecting) {
            let dropped = self.pending.len();
            self.fail(TransportError::Connect(err), dropped);
        }
        Next::Idle
    }

    /// Check an open connection for a peer close.
    ///
    /// A graceful close keeps any queued writes and reconnects straight away
    /// when some are waiting.
    pub fn poll(&mut self) -> Next {
        let ConnectionState::Open(conn) = &mut self.state else {
            return Next::Idle;
        };
        if !conn.peer_closed() {
            return Next::Idle;
        }
        conn.shutdown();
        self.state = ConnectionState::Absent;
        self.observer.closed(CloseReason::Graceful, 0);
        if self.pending.is_empty() || !self.reconnect {
            Next::Idle
        } else {
            self.begin_connect()
        }
    }

    /// Disable reconnects, tear down the connection and discard the queue.
    pub fn shutdown(&mut self) {
        self.reconnect = false;
        if let ConnectionState::Open(conn) = &mut self.state {
            conn.shutdown();
        }
        self.state = ConnectionState::Absent;
        let dropped = self.pending.len();
        self.pending.clear();
        self.observer.closed(CloseReason::Shutdown, dropped);
    }

    fn enqueue(&mut self, frame: Vec<u8>) {
        if self.pending.len() < self.max_pending {
            self.pending.push_back(frame);
        } else {
            self.overflowed += 1;
        }
    }

    fn begin_connect(&mut self) -> Next {
        self.state = ConnectionState::Connecting;
        self.observer.connecting();
        Next::Connect
    }

    fn fail(&mut self, err: TransportError, dropped: usize) {
        self.observer.error(&err);
        if let ConnectionState::Open(conn) = &mut self.state {
            conn.shutdown();
        }
        self.state = ConnectionState::Absent;
        self.pending.clear();
        self.failures = self.failures.saturating_add(1);
        self.observer.closed(CloseReason::Error, dropped);
    }
}
