//! Arguments accepted by the logging calls.
//!
//! Every value passed to a logging call is converted into a [`LogArg`] before
//! the entry builder sees it. Scalars are normalised to their string form at
//! conversion time (`None` becomes `"null"`, booleans become `"true"` or
//! `"false"`), sequences become tag lists, maps become metadata and the
//! override helpers [`category`], [`entry_ttl`] and [`meta_ttl`] produce
//! marker arguments.

use std::{
    collections::{BTreeMap, HashMap},
    error::Error,
    fmt::Display,
};

use crate::trace::{StackFrame, capture_frames};

/// Field overrides carried as arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigOverride {
    Category(i64),
    EntryTtl(i64),
    MetaTtl(i64),
}

/// An error value flattened at the call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorArg {
    pub message: String,
    pub frames: Vec<StackFrame>,
}

/// One classified logging argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogArg {
    /// Normalised scalar or string.
    Scalar(String),
    /// Values appended to the entry's tags.
    Tags(Vec<String>),
    /// Key/value pairs appended to the entry's metadata.
    Meta(Vec<(String, String)>),
    /// Named numeric samples.
    Metrics(Vec<(String, i16)>),
    Override(ConfigOverride),
    Error(ErrorArg),
}

impl LogArg {
    /// Build a tag list from any sequence of displayable values.
    pub fn tags<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        Self::Tags(values.into_iter().map(|v| v.to_string()).collect())
    }

    /// Build metadata from key/value pairs, preserving their order.
    pub fn meta<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        Self::Meta(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn metrics<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, i16)>,
        K: Display,
    {
        Self::Metrics(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Flatten an error into its message text and a stack snapshot taken at
    /// this call.
    pub fn error<E>(err: &E) -> Self
    where
        E: Error + ?Sized,
    {
        Self::Error(ErrorArg {
            message: err.to_string(),
            frames: capture_frames(),
        })
    }
}

/// Select the entry category.
pub fn category(value: i64) -> LogArg {
    LogArg::Override(ConfigOverride::Category(value))
}

/// Override the entry retention hint.
pub fn entry_ttl(value: i64) -> LogArg {
    LogArg::Override(ConfigOverride::EntryTtl(value))
}

/// Override the metadata retention hint.
pub fn meta_ttl(value: i64) -> LogArg {
    LogArg::Override(ConfigOverride::MetaTtl(value))
}

macro_rules! scalar_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LogArg {
                fn from(value: $ty) -> Self {
                    LogArg::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from!(
    &str, String, &String, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64
);

impl<T> From<Option<T>> for LogArg
where
    T: Into<LogArg>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => LogArg::Scalar("null".to_owned()),
        }
    }
}

impl<T: Display> From<Vec<T>> for LogArg {
    fn from(values: Vec<T>) -> Self {
        LogArg::tags(values)
    }
}

impl<T: Display> From<&[T]> for LogArg {
    fn from(values: &[T]) -> Self {
        LogArg::tags(values)
    }
}

impl<K: Display, V: Display> From<BTreeMap<K, V>> for LogArg {
    fn from(map: BTreeMap<K, V>) -> Self {
        LogArg::meta(map)
    }
}

impl<K: Display, V: Display, S> From<HashMap<K, V, S>> for LogArg {
    fn from(map: HashMap<K, V, S>) -> Self {
        LogArg::meta(map)
    }
}

impl From<ConfigOverride> for LogArg {
    fn from(value: ConfigOverride) -> Self {
        LogArg::Override(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LogArg::from(Option::<i32>::None), "null")]
    #[case(LogArg::from(true), "true")]
    #[case(LogArg::from(false), "false")]
    #[case(LogArg::from(123_456), "123456")]
    #[case(LogArg::from(-1.5), "-1.5")]
    #[case(LogArg::from('x'), "x")]
    #[case(LogArg::from(Some("set")), "set")]
    fn normalises_scalars(#[case] arg: LogArg, #[case] expected: &str) {
        assert_eq!(arg, LogArg::Scalar(expected.to_owned()));
    }

    #[test]
    fn sequences_become_tags() {
        assert_eq!(
            LogArg::from(vec![1, 2]),
            LogArg::Tags(vec!["1".into(), "2".into()])
        );
    }

    #[test]
    fn maps_become_meta() {
        let map = BTreeMap::from([("b", 2), ("a", 1)]);
        assert_eq!(
            LogArg::from(map),
            LogArg::Meta(vec![("a".into(), "1".into()), ("b".into(), "2".into())])
        );
    }

    #[test]
    fn errors_carry_message_and_frames() {
        let err = std::io::Error::other("disk on fire");
        let LogArg::Error(arg) = LogArg::error(&err) else {
            panic!("expected error argument");
        };
        assert_eq!(arg.message, "disk on fire");
        assert!(!arg.frames.is_empty());
    }
}
