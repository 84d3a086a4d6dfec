//! Connection primitives for the transport.
//!
//! The worker talks to the network through the [`Connector`] and
//! [`Connection`] traits. [`TlsConnector`] is the production implementation:
//! TCP with mutual TLS via `native-tls`.

use std::{
    fmt,
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{Certificate, Identity, Protocol, TlsStream};

use crate::error::BuildError;

/// Opens connections on behalf of the worker.
///
/// `connect` runs on a helper thread, so it may block for as long as its own
/// timeouts allow.
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(&self) -> io::Result<Self::Connection>;
}

/// An established outbound stream.
pub trait Connection: Send + 'static {
    /// Write a complete frame.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Report whether the peer has closed the stream.
    fn peer_closed(&mut self) -> bool {
        false
    }

    /// Tear down the stream. Errors are ignored.
    fn shutdown(&mut self) {}
}

/// Reads attempted per check before an unread stream is reported open.
const MAX_DRAIN_READS: usize = 16;

/// Read whatever the peer has sent until the stream would block.
///
/// The collector never sends application data, so inbound bytes (TLS alerts,
/// session tickets) are discarded. Returns `true` once end-of-stream or a
/// hard error is seen. `reader` must be in non-blocking mode.
fn drained_to_eof<R: Read>(reader: &mut R) -> bool {
    let mut scratch = [0u8; 512];
    for _ in 0..MAX_DRAIN_READS {
        match reader.read(&mut scratch) {
            Ok(0) => return true,
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(_) => return true,
        }
    }
    false
}

/// Check a plaintext TCP socket for end-of-stream, discarding inbound bytes.
pub fn tcp_peer_closed(stream: &TcpStream) -> bool {
    if stream.set_nonblocking(true).is_err() {
        return true;
    }
    let mut reader = stream;
    let closed = drained_to_eof(&mut reader);
    stream.set_nonblocking(false).is_err() || closed
}

/// Resolve `host:port` and connect to the first address that answers.
pub fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses resolved for {host}:{port}"),
        )
    }))
}

/// Key, certificate and CA bundle, all PEM encoded.
#[derive(Clone, Default)]
pub struct TlsMaterial {
    /// PKCS#8 private key.
    pub private_key_pem: Vec<u8>,
    pub certificate_pem: Vec<u8>,
    /// CA used to verify the collector's certificate.
    pub ca_pem: Vec<u8>,
    /// Name checked against the collector certificate; defaults to the host.
    pub domain: Option<String>,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("private_key_pem", &"<redacted>")
            .field("certificate_pem", &self.certificate_pem.len())
            .field("ca_pem", &self.ca_pem.len())
            .field("domain", &self.domain)
            .finish()
    }
}

/// Mutually authenticated TLS over TCP.
pub struct TlsConnector {
    host: String,
    port: u16,
    domain: String,
    connect_timeout: Duration,
    write_timeout: Duration,
    connector: native_tls::TlsConnector,
}

impl TlsConnector {
    /// Parse the TLS material and prepare a connector.
    ///
    /// Built-in roots are disabled so only `ca_pem` can vouch for the
    /// collector, and TLS 1.2 is the lowest accepted protocol.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: &TlsMaterial,
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Self, BuildError> {
        let host = host.into();
        let identity = Identity::from_pkcs8(&tls.certificate_pem, &tls.private_key_pem)?;
        let ca = Certificate::from_pem(&tls.ca_pem)?;
        let connector = native_tls::TlsConnector::builder()
            .identity(identity)
            .add_root_certificate(ca)
            .disable_built_in_roots(true)
            .min_protocol_version(Some(Protocol::Tlsv12))
            .build()?;
        Ok(Self {
            domain: tls.domain.clone().unwrap_or_else(|| host.clone()),
            host,
            port,
            connect_timeout,
            write_timeout,
            connector,
        })
    }
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl Connector for TlsConnector {
    type Connection = TlsConnection;

    fn connect(&self) -> io::Result<TlsConnection> {
        let stream = connect_tcp(&self.host, self.port, self.connect_timeout)?;
        stream.set_read_timeout(Some(self.connect_timeout))?;
        stream.set_write_timeout(Some(self.connect_timeout))?;
        let stream = self
            .connector
            .connect(&self.domain, stream)
            .map_err(io::Error::other)?;
        let tcp = stream.get_ref();
        tcp.set_nodelay(true)?;
        tcp.set_read_timeout(None)?;
        tcp.set_write_timeout(Some(self.write_timeout))?;
        Ok(TlsConnection { stream })
    }
}

/// Open TLS stream to the collector.
pub struct TlsConnection {
    stream: TlsStream<TcpStream>,
}

impl Connection for TlsConnection {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame)?;
        self.stream.flush()
    }

    /// Reads through the TLS layer so alerts and tickets are consumed; a
    /// close_notify surfaces as end-of-stream.
    fn peer_closed(&mut self) -> bool {
        if self.stream.get_ref().set_nonblocking(true).is_err() {
            return true;
        }
        let closed = drained_to_eof(&mut self.stream);
        self.stream.get_ref().set_nonblocking(false).is_err() || closed
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown();
    }
}
