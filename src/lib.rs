//! Structured logging client that ships compact binary entries to a remote
//! collector.
//!
//! A log call flows through three stages:
//!
//! 1. [`EntryBuilder`] classifies the call's [`LogArg`]s into a bounded
//!    [`FemtoEntry`];
//! 2. [`wire::encode`] serialises the entry together with an [`Xid`]
//!    correlation identifier;
//! 3. [`FemtoTransport`] queues the bytes for a worker thread that owns one
//!    mutually authenticated TLS connection.
//!
//! The identifier is returned to the caller straight away, rendered as 20
//! characters of lowercase base32-hex, whether or not the entry is ever
//! delivered.

pub mod codec;
pub mod entry;
pub mod error;
pub mod level;
pub mod limits;
pub mod log_arg;
pub mod logger;
mod logging_macros;
mod rate_limited_warner;
pub mod trace;
pub mod transport;
pub mod wire;
pub mod xid;

pub use codec::{BASE32_HEX, BaseN, DecodeError};
pub use entry::{EntryBuilder, FemtoEntry};
pub use error::BuildError;
pub use level::{FemtoLevel, ParseLevelError};
pub use limits::{EntryLimits, LimitsError};
pub use log_arg::{ConfigOverride, ErrorArg, LogArg, category, entry_ttl, meta_ttl};
pub use logger::{FemtoLogger, LoggerBuilder};
pub use rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner};
pub use trace::{FrameFilter, StackFrame};
pub use transport::{
    BackoffOverrides, CloseReason, Connection, Connector, FemtoTransport, LogObserver,
    TlsMaterial, TransportBuilder, TransportError, TransportObserver,
};
pub use wire::{WireError, WireMessage};
pub use xid::{XID_LEN, XID_TEXT_LEN, Xid, XidError, XidGenerator};

