//! Plaintext collector and connector used by the integration tests.
//!
//! The collector reads size-prefixed wire messages from each accepted
//! connection and forwards them, decoded, through a channel. It can be told to
//! hang up after a number of messages so reconnect paths can be exercised
//! without TLS material.

#![allow(dead_code)]

use std::{
    io::{self, Read},
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use femtowire::{
    Connection, Connector, WireMessage,
    transport::{connect_tcp, tcp_peer_closed},
    wire,
};
use rstest::fixture;

pub const WAIT: Duration = Duration::from_secs(2);

/// Connector that skips TLS, for tests only.
pub struct PlainTcpConnector {
    pub addr: SocketAddr,
}

impl Connector for PlainTcpConnector {
    type Connection = PlainTcpConnection;

    fn connect(&self) -> io::Result<PlainTcpConnection> {
        let stream = connect_tcp(&self.addr.ip().to_string(), self.addr.port(), WAIT)?;
        stream.set_nodelay(true)?;
        Ok(PlainTcpConnection { stream })
    }
}

pub struct PlainTcpConnection {
    stream: TcpStream,
}

impl Connection for PlainTcpConnection {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.stream, frame)
    }

    fn peer_closed(&mut self) -> bool {
        tcp_peer_closed(&self.stream)
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

/// Events reported by the collector thread.
#[derive(Debug)]
pub enum CollectorEvent {
    Accepted,
    Message(WireMessage),
    HungUp,
}

pub struct Collector {
    pub addr: SocketAddr,
    pub events: Receiver<CollectorEvent>,
}

impl Collector {
    /// Wait for the next decoded message, skipping connection events.
    pub fn next_message(&self) -> WireMessage {
        loop {
            match self.events.recv_timeout(WAIT).expect("collector event") {
                CollectorEvent::Message(message) => return message,
                CollectorEvent::Accepted | CollectorEvent::HungUp => {}
            }
        }
    }

    /// Wait until the collector has closed its side of a connection.
    pub fn wait_for_hang_up(&self) {
        loop {
            if let CollectorEvent::HungUp = self.events.recv_timeout(WAIT).expect("collector event")
            {
                return;
            }
        }
    }
}

/// Start a collector that closes each connection after `per_connection`
/// messages, or keeps it until EOF when `None`.
pub fn spawn_collector(per_connection: Option<usize>) -> Collector {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { return };
            if tx.send(CollectorEvent::Accepted).is_err() {
                return;
            }
            serve(stream, per_connection, &tx);
        }
    });
    Collector { addr, events: rx }
}

fn serve(mut stream: TcpStream, per_connection: Option<usize>, tx: &Sender<CollectorEvent>) {
    let mut served = 0;
    while per_connection.is_none_or(|limit| served < limit) {
        let mut size = [0u8; 2];
        if stream.read_exact(&mut size).is_err() {
            return;
        }
        let len = usize::from(u16::from_be_bytes(size));
        let mut frame = vec![0u8; len];
        frame[..2].copy_from_slice(&size);
        if stream.read_exact(&mut frame[2..]).is_err() {
            return;
        }
        let message = wire::decode(&frame).expect("collector received a valid frame");
        if tx.send(CollectorEvent::Message(message)).is_err() {
            return;
        }
        served += 1;
    }
    drop(stream);
    let _ = tx.send(CollectorEvent::HungUp);
}

#[fixture]
pub fn collector() -> Collector {
    spawn_collector(None)
}
