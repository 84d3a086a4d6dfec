//! Normalised log entries and the builder that classifies call arguments.
//!
//! [`EntryBuilder::build`] walks the arguments once, left to right, and never
//! fails: oversized strings are truncated at a UTF-8 boundary, surplus tags,
//! metadata, metrics and frames are dropped, and out-of-range overrides clamp
//! to the nearest bound.

use crate::{
    level::FemtoLevel,
    limits::EntryLimits,
    log_arg::{ConfigOverride, LogArg},
    trace::{FrameFilter, StackFrame, capture_frames},
};

/// One log call, bounded and ready for encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FemtoEntry {
    pub bucket_id: u32,
    pub severity: FemtoLevel,
    pub message: String,
    pub category: u8,
    pub tags: Vec<String>,
    pub metrics: Vec<(String, i16)>,
    pub meta: Vec<(String, String)>,
    /// Call stack, innermost frame first.
    pub frames: Vec<StackFrame>,
    pub ttl_entry: u16,
    pub ttl_meta: u16,
}

/// Truncate `text` to at most `max` bytes without splitting a character.
pub(crate) fn truncate_utf8(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn clamp_to(value: i64, max: u16) -> u16 {
    value.clamp(0, i64::from(max)) as u16
}

/// Builds entries for one logger.
#[derive(Clone, Debug)]
pub struct EntryBuilder {
    bucket_id: u32,
    default_entry_ttl: u16,
    default_meta_ttl: u16,
    limits: EntryLimits,
    frame_filter: FrameFilter,
}

impl EntryBuilder {
    /// Create a builder. Default TTLs above `limits.max_ttl` are clamped.
    pub fn new(
        bucket_id: u32,
        default_entry_ttl: u16,
        default_meta_ttl: u16,
        limits: EntryLimits,
    ) -> Self {
        Self {
            bucket_id,
            default_entry_ttl: default_entry_ttl.min(limits.max_ttl),
            default_meta_ttl: default_meta_ttl.min(limits.max_ttl),
            limits,
            frame_filter: FrameFilter::default(),
        }
    }

    /// Replace the predicate used to drop logging frames from traces.
    pub fn with_frame_filter(mut self, filter: FrameFilter) -> Self {
        self.frame_filter = filter;
        self
    }

    pub fn bucket_id(&self) -> u32 {
        self.bucket_id
    }

    pub fn limits(&self) -> &EntryLimits {
        &self.limits
    }

    /// Classify `args` into an entry of the given severity.
    ///
    /// An error argument supplies the trace when no trace has been taken yet;
    /// otherwise the current stack is captured once all arguments are
    /// consumed.
    pub fn build<I>(&self, severity: FemtoLevel, args: I) -> FemtoEntry
    where
        I: IntoIterator<Item = LogArg>,
    {
        let mut entry = FemtoEntry {
            bucket_id: self.bucket_id,
            severity,
            ttl_entry: self.default_entry_ttl,
            ttl_meta: self.default_meta_ttl,
            ..FemtoEntry::default()
        };
        for arg in args {
            match arg {
                LogArg::Error(err) => {
                    if entry.frames.is_empty() {
                        entry.frames = self.bound_frames(err.frames);
                    }
                    self.push_scalar(&mut entry, err.message);
                }
                LogArg::Override(value) => self.apply_override(&mut entry, value),
                LogArg::Tags(values) => {
                    for value in values {
                        self.push_tag(&mut entry, value);
                    }
                }
                LogArg::Meta(pairs) => self.push_meta(&mut entry, pairs),
                LogArg::Metrics(pairs) => self.push_metrics(&mut entry, pairs),
                LogArg::Scalar(text) => self.push_scalar(&mut entry, text),
            }
        }
        if entry.frames.is_empty() {
            entry.frames = self.bound_frames(capture_frames());
        }
        entry
    }

    fn apply_override(&self, entry: &mut FemtoEntry, value: ConfigOverride) {
        match value {
            ConfigOverride::Category(category) => {
                entry.category = clamp_to(category, u16::from(self.limits.max_category)) as u8;
            }
            ConfigOverride::EntryTtl(ttl) => entry.ttl_entry = clamp_to(ttl, self.limits.max_ttl),
            ConfigOverride::MetaTtl(ttl) => entry.ttl_meta = clamp_to(ttl, self.limits.max_ttl),
        }
    }

    fn push_scalar(&self, entry: &mut FemtoEntry, text: String) {
        if entry.message.is_empty() {
            entry.message = truncate_utf8(text, self.limits.max_message_size);
        } else {
            self.push_tag(entry, text);
        }
    }

    fn push_tag(&self, entry: &mut FemtoEntry, tag: String) {
        if entry.tags.len() < self.limits.max_tags_count {
            entry.tags.push(truncate_utf8(tag, self.limits.max_tag_size));
        }
    }

    fn push_meta(&self, entry: &mut FemtoEntry, pairs: Vec<(String, String)>) {
        for (key, value) in pairs {
            if entry.meta.len() >= self.limits.max_meta_count {
                break;
            }
            entry.meta.push((
                truncate_utf8(key, self.limits.max_meta_key_size),
                truncate_utf8(value, self.limits.max_meta_value_size),
            ));
        }
    }

    fn push_metrics(&self, entry: &mut FemtoEntry, pairs: Vec<(String, i16)>) {
        for (key, value) in pairs {
            if entry.metrics.len() >= self.limits.max_metric_count {
                break;
            }
            entry
                .metrics
                .push((truncate_utf8(key, self.limits.max_metric_key_size), value));
        }
    }

    fn bound_frames(&self, frames: Vec<StackFrame>) -> Vec<StackFrame> {
        frames
            .into_iter()
            .filter(|frame| self.frame_filter.keeps(frame))
            .take(self.limits.max_stack_trace_count)
            .map(|mut frame| {
                frame.path = truncate_utf8(frame.path, self.limits.max_stack_trace_path_size);
                frame
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
