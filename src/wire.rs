//! Fixed-layout binary encoding of entries.
//!
//! Every message starts with a 19-byte header:
//!
//! | Offset | Field | Encoding |
//! |---|---|---|
//! | 0 | total size, including this field | u16 |
//! | 2 | bucket id | u32 |
//! | 6 | identifier timestamp | u32 |
//! | 10 | machine fingerprint | 3 bytes |
//! | 13 | process fingerprint | u16 |
//! | 15 | sequence | 3 bytes |
//! | 18 | severity | u8 |
//!
//! followed by the message, category, tags, metrics, metadata, stack frames
//! and the two TTLs. Integers are big-endian; strings carry a one-byte length
//! prefix except metadata values, which use two bytes. The twelve bytes at
//! [`XID_OFFSET`] are the raw identifier.

use thiserror::Error;

use crate::{
    entry::FemtoEntry,
    level::FemtoLevel,
    trace::StackFrame,
    xid::{XID_LEN, Xid},
};

/// Offset of the raw identifier inside a message.
pub const XID_OFFSET: usize = 6;
/// Offset of the severity byte.
pub const SEVERITY_OFFSET: usize = XID_OFFSET + XID_LEN;
/// Bytes preceding the message field.
pub const HEADER_LEN: usize = SEVERITY_OFFSET + 1;

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The message would exceed the destination capacity.
    #[error("message needs {needed} bytes but capacity is {capacity}")]
    Overflow { needed: usize, capacity: usize },
    /// A string is longer than its length prefix can express.
    #[error("{field} of {len} bytes does not fit its length prefix")]
    LengthPrefix { field: &'static str, len: usize },
    /// A count field is larger than its one-byte prefix.
    #[error("{field} holds {count} items, more than 255")]
    Count { field: &'static str, count: usize },
    /// The input ended before the message was complete.
    #[error("message truncated at offset {offset}")]
    Truncated { offset: usize },
    /// The size field does not match the input length.
    #[error("size field says {declared} bytes but {actual} were supplied")]
    SizeMismatch { declared: usize, actual: usize },
    #[error("invalid UTF-8 in {field}")]
    Utf8 { field: &'static str },
    #[error("severity {0} is out of range")]
    Severity(u8),
}

struct FrameWriter {
    buf: Vec<u8>,
    capacity: usize,
}

impl FrameWriter {
    fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        let needed = self.buf.len() + bytes.len();
        if needed > self.capacity {
            return Err(WireError::Overflow {
                needed,
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn put_u8(&mut self, value: u8) -> Result<(), WireError> {
        self.put(&[value])
    }

    fn put_u16(&mut self, value: u16) -> Result<(), WireError> {
        self.put(&value.to_be_bytes())
    }

    fn put_count(&mut self, field: &'static str, count: usize) -> Result<(), WireError> {
        let count = u8::try_from(count).map_err(|_| WireError::Count { field, count })?;
        self.put_u8(count)
    }

    fn put_str8(&mut self, field: &'static str, text: &str) -> Result<(), WireError> {
        let len = u8::try_from(text.len()).map_err(|_| WireError::LengthPrefix {
            field,
            len: text.len(),
        })?;
        self.put_u8(len)?;
        self.put(text.as_bytes())
    }

    fn put_str16(&mut self, field: &'static str, text: &str) -> Result<(), WireError> {
        let len = u16::try_from(text.len()).map_err(|_| WireError::LengthPrefix {
            field,
            len: text.len(),
        })?;
        self.put_u16(len)?;
        self.put(text.as_bytes())
    }

    /// Write the accumulated length into the leading size field.
    fn finish(mut self) -> Result<Vec<u8>, WireError> {
        let total = u16::try_from(self.buf.len()).map_err(|_| WireError::Overflow {
            needed: self.buf.len(),
            capacity: u16::MAX as usize,
        })?;
        self.buf[0..2].copy_from_slice(&total.to_be_bytes());
        Ok(self.buf)
    }
}

/// Serialise `entry` under `bucket_id` and `xid`, never writing more than
/// `capacity` bytes.
///
/// Caps are the entry builder's responsibility; the encoder only refuses
/// values its prefixes cannot represent and messages larger than `capacity`.
pub fn encode(
    entry: &FemtoEntry,
    bucket_id: u32,
    xid: &Xid,
    capacity: usize,
) -> Result<Vec<u8>, WireError> {
    let mut w = FrameWriter::new(capacity);
    w.put_u16(0)?;
    w.put(&bucket_id.to_be_bytes())?;
    w.put(xid.as_bytes())?;
    w.put_u8(entry.severity.as_u8())?;
    w.put_str8("message", &entry.message)?;
    w.put_u8(entry.category)?;

    w.put_count("tags", entry.tags.len())?;
    for tag in &entry.tags {
        w.put_str8("tag", tag)?;
    }

    w.put_count("metrics", entry.metrics.len())?;
    for (key, value) in &entry.metrics {
        w.put_str8("metric key", key)?;
        w.put(&value.to_be_bytes())?;
    }

    w.put_count("meta", entry.meta.len())?;
    for (key, value) in &entry.meta {
        w.put_str8("meta key", key)?;
        w.put_str16("meta value", value)?;
    }

    w.put_count("frames", entry.frames.len())?;
    for frame in &entry.frames {
        w.put_str8("frame path", &frame.path)?;
        w.put_u16(u16::try_from(frame.line).unwrap_or(u16::MAX))?;
    }

    w.put_u16(entry.ttl_entry)?;
    w.put_u16(entry.ttl_meta)?;
    w.finish()
}

/// Extract the raw identifier from a message header.
pub fn xid_of(message: &[u8]) -> Option<Xid> {
    let raw: [u8; XID_LEN] = message
        .get(XID_OFFSET..XID_OFFSET + XID_LEN)?
        .try_into()
        .ok()?;
    Some(Xid::from_bytes(raw))
}

/// A decoded wire message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireMessage {
    pub bucket_id: u32,
    pub xid: Xid,
    pub entry: FemtoEntry,
}

struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos + len;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or(WireError::Truncated { offset: self.pos })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn text(&mut self, field: &'static str, len: usize) -> Result<String, WireError> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::Utf8 { field })
    }

    fn str8(&mut self, field: &'static str) -> Result<String, WireError> {
        let len = usize::from(self.u8()?);
        self.text(field, len)
    }

    fn str16(&mut self, field: &'static str) -> Result<String, WireError> {
        let len = usize::from(self.u16()?);
        self.text(field, len)
    }
}

/// Parse a complete message produced by [`encode`].
pub fn decode(message: &[u8]) -> Result<WireMessage, WireError> {
    let mut r = FrameReader {
        buf: message,
        pos: 0,
    };
    let declared = usize::from(r.u16()?);
    if declared != message.len() {
        return Err(WireError::SizeMismatch {
            declared,
            actual: message.len(),
        });
    }
    let bucket_id = r.u32()?;
    let raw: [u8; XID_LEN] = r
        .take(XID_LEN)?
        .try_into()
        .map_err(|_| WireError::Truncated { offset: XID_OFFSET })?;
    let xid = Xid::from_bytes(raw);
    let severity_value = r.u8()?;
    let severity = FemtoLevel::from_u8(severity_value).ok_or(WireError::Severity(severity_value))?;
    let message_text = r.str8("message")?;
    let category = r.u8()?;

    let tag_count = r.u8()?;
    let tags = (0..tag_count)
        .map(|_| r.str8("tag"))
        .collect::<Result<Vec<_>, _>>()?;

    let metric_count = r.u8()?;
    let mut metrics = Vec::with_capacity(usize::from(metric_count));
    for _ in 0..metric_count {
        let key = r.str8("metric key")?;
        let value = r.u16()? as i16;
        metrics.push((key, value));
    }

    let meta_count = r.u8()?;
    let mut meta = Vec::with_capacity(usize::from(meta_count));
    for _ in 0..meta_count {
        let key = r.str8("meta key")?;
        let value = r.str16("meta value")?;
        meta.push((key, value));
    }

    let frame_count = r.u8()?;
    let mut frames = Vec::with_capacity(usize::from(frame_count));
    for _ in 0..frame_count {
        let path = r.str8("frame path")?;
        let line = u32::from(r.u16()?);
        frames.push(StackFrame {
            path,
            line,
            function: String::new(),
        });
    }

    let ttl_entry = r.u16()?;
    let ttl_meta = r.u16()?;
    if r.pos != message.len() {
        return Err(WireError::SizeMismatch {
            declared,
            actual: r.pos,
        });
    }

    Ok(WireMessage {
        bucket_id,
        xid,
        entry: FemtoEntry {
            bucket_id,
            severity,
            message: message_text,
            category,
            tags,
            metrics,
            meta,
            frames,
            ttl_entry,
            ttl_meta,
        },
    })
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
