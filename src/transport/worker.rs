//! Worker thread owning the connection and pending queue.
//!
//! Callers reach the worker only through a bounded channel, so every state
//! transition happens on this one thread. Connect attempts run on short-lived
//! helper threads that report back through a second channel, which keeps the
//! worker responsive while a handshake is in flight. A ticker checks the open
//! connection for a peer close however busy the command channel is.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use log::warn;

use crate::rate_limited_warner::RateLimitedWarner;

use super::{
    backoff::BackoffState,
    config::TransportConfig,
    connection::Connector,
    observer::TransportObserver,
    state::{ConnectionMachine, Next, Phase},
    warn_queue_full,
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum TransportCommand {
    /// An encoded wire message.
    Send(Vec<u8>),
    /// Acknowledge once no connect attempt is in flight; the payload reports
    /// whether the connection is open.
    Flush(Sender<bool>),
    Shutdown(Sender<()>),
}

pub fn spawn_worker<C: Connector>(
    config: TransportConfig,
    connector: C,
    observer: Arc<dyn TransportObserver>,
    queue_full: Arc<RateLimitedWarner>,
) -> io::Result<(Sender<TransportCommand>, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded(config.capacity);
    let handle = thread::Builder::new()
        .name("femtowire-transport".into())
        .spawn(move || Worker::new(config, Arc::new(connector), observer, queue_full).run(rx))?;
    Ok((tx, handle))
}

struct Worker<C: Connector> {
    poll_interval: Duration,
    connector: Arc<C>,
    machine: ConnectionMachine<C::Connection>,
    backoff: BackoffState,
    results_tx: Sender<io::Result<C::Connection>>,
    results_rx: Receiver<io::Result<C::Connection>>,
    cancelled: Arc<AtomicBool>,
    waiters: Vec<Sender<bool>>,
    queue_full: Arc<RateLimitedWarner>,
}

impl<C: Connector> Worker<C> {
    fn new(
        config: TransportConfig,
        connector: Arc<C>,
        observer: Arc<dyn TransportObserver>,
        queue_full: Arc<RateLimitedWarner>,
    ) -> Self {
        let (results_tx, results_rx) = bounded(1);
        Self {
            poll_interval: config.poll_interval,
            connector,
            machine: ConnectionMachine::new(observer, config.capacity),
            backoff: BackoffState::new(config.backoff),
            results_tx,
            results_rx,
            cancelled: Arc::new(AtomicBool::new(false)),
            waiters: Vec::new(),
            queue_full,
        }
    }

    fn run(mut self, rx: Receiver<TransportCommand>) {
        let results = self.results_rx.clone();
        let ticker = tick(self.poll_interval);
        loop {
            let next = select! {
                recv(rx) -> cmd => match cmd {
                    Ok(TransportCommand::Send(frame)) => self.machine.on_send(frame),
                    Ok(TransportCommand::Flush(ack)) => {
                        self.waiters.push(ack);
                        Next::Idle
                    }
                    Ok(TransportCommand::Shutdown(ack)) => {
                        self.stop();
                        let _ = ack.send(());
                        return;
                    }
                    Err(_) => {
                        self.stop();
                        return;
                    }
                },
                recv(results) -> result => match result {
                    Ok(Ok(conn)) => {
                        self.backoff.record_success(Instant::now());
                        self.machine.on_connected(conn)
                    }
                    Ok(Err(err)) => self.machine.on_connect_failed(err),
                    Err(_) => Next::Idle,
                },
                recv(ticker) -> _ => self.machine.poll(),
            };
            if next == Next::Connect {
                self.start_connect();
            }
            self.report_overflow();
            self.settle_waiters();
        }
    }

    fn report_overflow(&mut self) {
        let dropped = self.machine.take_overflowed();
        if dropped > 0 {
            self.queue_full.record_drops(dropped);
            self.queue_full.warn_if_due(warn_queue_full);
        }
    }

    fn start_connect(&mut self) {
        let delay = (self.machine.failures() > 0).then(|| self.backoff.next_sleep(Instant::now()));
        let connector = Arc::clone(&self.connector);
        let results = self.results_tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        let spawned = thread::Builder::new()
            .name("femtowire-connect".into())
            .spawn(move || {
                if let Some(delay) = delay {
                    thread::sleep(delay);
                }
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                let _ = results.send(connector.connect());
            });
        if let Err(err) = spawned {
            warn!("femtowire transport could not spawn connect thread: {err}");
            let next = self.machine.on_connect_failed(err);
            debug_assert_eq!(next, Next::Idle);
        }
    }

    fn settle_waiters(&mut self) {
        let phase = self.machine.phase();
        if phase == Phase::Connecting || self.waiters.is_empty() {
            return;
        }
        let open = phase == Phase::Open;
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(open);
        }
    }

    fn stop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.machine.shutdown();
        self.report_overflow();
        self.queue_full.flush(warn_queue_full);
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(false);
        }
    }
}
