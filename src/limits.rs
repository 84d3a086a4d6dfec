//! Size and count caps applied while building entries.
//!
//! Limits are supplied by the embedding application, typically deserialised
//! from its own configuration document. Every field has a default so a
//! partial document is accepted. [`EntryLimits::validate`] checks the caps
//! against the wire format's length prefixes and against `max_entry_size`, so
//! an entry built within the caps always fits the encoder's buffer.

use serde::Deserialize;
use thiserror::Error;

use crate::wire::HEADER_LEN;

/// Errors describing limits that cannot be honoured by the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    /// A cap exceeds what its length prefix can express.
    #[error("{field} of {value} exceeds the wire maximum of {max}")]
    ExceedsPrefix {
        field: &'static str,
        value: usize,
        max: usize,
    },
    /// The largest possible entry does not fit `max_entry_size`.
    #[error("worst-case entry of {required} bytes exceeds max_entry_size {max_entry_size}")]
    EntryTooSmall {
        required: usize,
        max_entry_size: usize,
    },
}

/// Caps applied by the entry builder.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntryLimits {
    pub max_entry_size: usize,
    pub max_message_size: usize,
    pub max_category: u8,
    pub max_tag_size: usize,
    pub max_tags_count: usize,
    pub max_meta_key_size: usize,
    pub max_meta_value_size: usize,
    pub max_meta_count: usize,
    pub max_metric_key_size: usize,
    pub max_metric_count: usize,
    pub max_stack_trace_count: usize,
    pub max_stack_trace_path_size: usize,
    pub max_ttl: u16,
}

impl Default for EntryLimits {
    fn default() -> Self {
        Self {
            max_entry_size: u16::MAX as usize,
            max_message_size: 255,
            max_category: 255,
            max_tag_size: 64,
            max_tags_count: 32,
            max_meta_key_size: 64,
            max_meta_value_size: 1024,
            max_meta_count: 32,
            max_metric_key_size: 64,
            max_metric_count: 32,
            max_stack_trace_count: 32,
            max_stack_trace_path_size: 255,
            max_ttl: 3650,
        }
    }
}

const U8_MAX: usize = u8::MAX as usize;
const U16_MAX: usize = u16::MAX as usize;

impl EntryLimits {
    /// Bytes needed by an entry that hits every cap at once.
    pub fn worst_case_entry_size(&self) -> usize {
        let message = 1 + self.max_message_size;
        let category = 1;
        let tags = 1 + self.max_tags_count * (1 + self.max_tag_size);
        let metrics = 1 + self.max_metric_count * (1 + self.max_metric_key_size + 2);
        let meta =
            1 + self.max_meta_count * (1 + self.max_meta_key_size + 2 + self.max_meta_value_size);
        let frames = 1 + self.max_stack_trace_count * (1 + self.max_stack_trace_path_size + 2);
        let ttls = 4;
        HEADER_LEN + message + category + tags + metrics + meta + frames + ttls
    }

    /// Check every cap against its wire prefix and the entry size budget.
    pub fn validate(&self) -> Result<(), LimitsError> {
        let prefixed: [(&'static str, usize, usize); 11] = [
            ("max_entry_size", self.max_entry_size, U16_MAX),
            ("max_message_size", self.max_message_size, U8_MAX),
            ("max_tag_size", self.max_tag_size, U8_MAX),
            ("max_tags_count", self.max_tags_count, U8_MAX),
            ("max_meta_key_size", self.max_meta_key_size, U8_MAX),
            ("max_meta_value_size", self.max_meta_value_size, U16_MAX),
            ("max_meta_count", self.max_meta_count, U8_MAX),
            ("max_metric_key_size", self.max_metric_key_size, U8_MAX),
            ("max_metric_count", self.max_metric_count, U8_MAX),
            ("max_stack_trace_count", self.max_stack_trace_count, U8_MAX),
            (
                "max_stack_trace_path_size",
                self.max_stack_trace_path_size,
                U8_MAX,
            ),
        ];
        for (field, value, max) in prefixed {
            if value > max {
                return Err(LimitsError::ExceedsPrefix { field, value, max });
            }
        }
        let required = self.worst_case_entry_size();
        if required > self.max_entry_size {
            return Err(LimitsError::EntryTooSmall {
                required,
                max_entry_size: self.max_entry_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_are_consistent() {
        let limits = EntryLimits::default();
        assert_eq!(limits.validate(), Ok(()));
        assert!(limits.worst_case_entry_size() <= limits.max_entry_size);
    }

    #[rstest]
    #[case(EntryLimits { max_message_size: 256, ..EntryLimits::default() }, "max_message_size")]
    #[case(EntryLimits { max_tags_count: 300, ..EntryLimits::default() }, "max_tags_count")]
    #[case(EntryLimits { max_entry_size: 70_000, ..EntryLimits::default() }, "max_entry_size")]
    fn rejects_caps_beyond_length_prefixes(#[case] limits: EntryLimits, #[case] name: &str) {
        assert!(matches!(
            limits.validate(),
            Err(LimitsError::ExceedsPrefix { field, .. }) if field == name
        ));
    }

    #[test]
    fn rejects_entry_size_below_worst_case() {
        let limits = EntryLimits {
            max_entry_size: 1024,
            ..EntryLimits::default()
        };
        assert!(matches!(
            limits.validate(),
            Err(LimitsError::EntryTooSmall { max_entry_size: 1024, .. })
        ));
    }

    #[test]
    fn deserialises_partial_documents() {
        let limits: EntryLimits =
            serde_json::from_str(r#"{"max_tags_count": 4, "max_ttl": 30}"#).expect("valid json");
        assert_eq!(limits.max_tags_count, 4);
        assert_eq!(limits.max_ttl, 30);
        assert_eq!(limits.max_message_size, EntryLimits::default().max_message_size);
    }
}
