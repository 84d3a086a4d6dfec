//! Correlation identifiers.
//!
//! An [`Xid`] is twelve bytes laid out as
//! `[timestamp:4][machine:3][process:2][sequence:3]`, all big-endian. It is
//! rendered as twenty lowercase base32-hex symbols. [`XidGenerator`] owns the
//! per-process state (machine fingerprint, process fingerprint, sequence
//! counter) and is held by exactly one transport.

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU32, Ordering},
};

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::codec::{BASE32_HEX, DecodeError};

/// Raw identifier length in bytes.
pub const XID_LEN: usize = 12;
/// Rendered identifier length in symbols.
pub const XID_TEXT_LEN: usize = 20;

const SEQUENCE_MASK: u32 = 0x00FF_FFFF;

/// Errors returned when parsing identifier text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XidError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("identifier decodes to {0} bytes, expected 12")]
    Length(usize),
}

/// Twelve-byte correlation identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Xid([u8; XID_LEN]);

impl Xid {
    /// Assemble an identifier from its components. Only the low 24 bits of
    /// `sequence` are kept.
    pub fn from_parts(timestamp: u32, machine: [u8; 3], process: u16, sequence: u32) -> Self {
        let mut raw = [0u8; XID_LEN];
        raw[0..4].copy_from_slice(&timestamp.to_be_bytes());
        raw[4..7].copy_from_slice(&machine);
        raw[7..9].copy_from_slice(&process.to_be_bytes());
        raw[9..12].copy_from_slice(&(sequence & SEQUENCE_MASK).to_be_bytes()[1..]);
        Self(raw)
    }

    pub fn from_bytes(raw: [u8; XID_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; XID_LEN] {
        &self.0
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp()), 0)
    }

    pub fn machine(&self) -> [u8; 3] {
        [self.0[4], self.0[5], self.0[6]]
    }

    pub fn process(&self) -> u16 {
        u16::from_be_bytes([self.0[7], self.0[8]])
    }

    pub fn sequence(&self) -> u32 {
        u32::from_be_bytes([0, self.0[9], self.0[10], self.0[11]])
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_HEX.encode(&self.0))
    }
}

impl FromStr for Xid {
    type Err = XidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE32_HEX.decode(s)?;
        let raw: [u8; XID_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| XidError::Length(bytes.len()))?;
        Ok(Self(raw))
    }
}

/// Derive the machine fingerprint from a host name.
///
/// The first three bytes of the SHA-256 digest of the name keep the value
/// stable across restarts. Without a usable name, three random bytes are used
/// instead and the value is only stable for the lifetime of the generator.
pub fn machine_fingerprint(host: Option<&str>) -> [u8; 3] {
    match host.filter(|h| !h.is_empty()) {
        Some(name) => {
            let digest = Sha256::digest(name.as_bytes());
            [digest[0], digest[1], digest[2]]
        }
        None => {
            let mut bytes = [0u8; 3];
            rand::thread_rng().fill(&mut bytes);
            bytes
        }
    }
}

fn local_host_name() -> Option<String> {
    gethostname::gethostname().into_string().ok()
}

fn now_secs() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Stamps identifiers for one transport.
#[derive(Debug)]
pub struct XidGenerator {
    machine: [u8; 3],
    process: u16,
    sequence: AtomicU32,
}

impl XidGenerator {
    /// Capture host and process fingerprints and seed the sequence from
    /// three random bytes.
    pub fn new() -> Self {
        let host = local_host_name();
        let seed = rand::thread_rng().gen_range(0..=SEQUENCE_MASK);
        Self {
            machine: machine_fingerprint(host.as_deref()),
            process: (std::process::id() & 0xFFFF) as u16,
            sequence: AtomicU32::new(seed),
        }
    }

    /// Build a generator with fixed fingerprints and starting sequence.
    #[cfg(any(test, feature = "test-util"))]
    pub fn with_state(machine: [u8; 3], process: u16, sequence: u32) -> Self {
        Self {
            machine,
            process,
            sequence: AtomicU32::new(sequence & SEQUENCE_MASK),
        }
    }

    pub fn machine(&self) -> [u8; 3] {
        self.machine
    }

    pub fn process(&self) -> u16 {
        self.process
    }

    /// Produce the next identifier using the current wall-clock second.
    pub fn next(&self) -> Xid {
        self.next_at(now_secs())
    }

    /// Produce the next identifier for an explicit timestamp.
    ///
    /// The counter is a `u32` whose low 24 bits are used; because `2^32` is a
    /// multiple of `2^24`, the emitted value wraps cleanly modulo `2^24`.
    pub fn next_at(&self, timestamp: u32) -> Xid {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        Xid::from_parts(timestamp, self.machine, self.process, sequence)
    }
}

impl Default for XidGenerator {
    fn default() -> Self {
        Self::new()
    }
}
