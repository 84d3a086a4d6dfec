//! Tests for argument classification in [`EntryBuilder`].

use std::collections::BTreeMap;

use proptest::prelude::*;
use rstest::{fixture, rstest};

use super::*;
use crate::log_arg::{category, entry_ttl, meta_ttl};

fn small_limits() -> EntryLimits {
    EntryLimits {
        max_message_size: 16,
        max_category: 20,
        max_tag_size: 8,
        max_tags_count: 4,
        max_meta_key_size: 6,
        max_meta_value_size: 10,
        max_meta_count: 2,
        max_metric_key_size: 6,
        max_metric_count: 2,
        max_stack_trace_count: 3,
        max_stack_trace_path_size: 12,
        max_ttl: 90,
        ..EntryLimits::default()
    }
}

#[fixture]
fn builder() -> EntryBuilder {
    EntryBuilder::new(7, 30, 14, small_limits())
}

#[test]
fn classifies_format_string_number_and_map() {
    let builder = EntryBuilder::new(7, 30, 14, EntryLimits::default());
    let entry = builder.build(
        FemtoLevel::Info,
        [
            LogArg::from("order %d created"),
            LogArg::from(123_456),
            LogArg::from(BTreeMap::from([("foo", "bar")])),
        ],
    );
    assert_eq!(entry.message, "order %d created");
    assert_eq!(entry.tags, ["123456"]);
    assert_eq!(entry.meta, [("foo".to_owned(), "bar".to_owned())]);
    assert_eq!(entry.bucket_id, 7);
    assert_eq!(entry.severity, FemtoLevel::Info);
}

#[rstest]
fn truncates_message_to_cap(builder: EntryBuilder) {
    let entry = builder.build(FemtoLevel::Debug, [LogArg::from("x".repeat(16 + 5))]);
    assert_eq!(entry.message.len(), 16);
}

#[rstest]
fn truncation_respects_character_boundaries(builder: EntryBuilder) {
    // Fifteen ASCII bytes followed by a two-byte character.
    let text = format!("{}é", "a".repeat(15));
    let entry = builder.build(FemtoLevel::Debug, [LogArg::from(text)]);
    assert_eq!(entry.message, "a".repeat(15));
}

#[rstest]
fn caps_tags_keeping_first_in_order(builder: EntryBuilder) {
    let mut args = vec![LogArg::from("message")];
    args.extend((0..4 + 3).map(|i| LogArg::from(format!("t{i}"))));
    let entry = builder.build(FemtoLevel::Notice, args);
    assert_eq!(entry.tags, ["t0", "t1", "t2", "t3"]);
}

#[rstest]
fn list_arguments_extend_tags_and_truncate(builder: EntryBuilder) {
    let entry = builder.build(
        FemtoLevel::Info,
        [
            LogArg::from(vec!["alpha", "a-very-long-tag"]),
            LogArg::from("msg"),
        ],
    );
    assert_eq!(entry.tags, ["alpha", "a-very-l"]);
    assert_eq!(entry.message, "msg");
}

#[rstest]
#[case(-5, 0)]
#[case(20 + 100, 20)]
#[case(11, 11)]
fn clamps_category(builder: EntryBuilder, #[case] requested: i64, #[case] expected: u8) {
    let entry = builder.build(FemtoLevel::Info, [category(requested)]);
    assert_eq!(entry.category, expected);
}

#[rstest]
fn ttl_overrides_clamp_to_range(builder: EntryBuilder) {
    let entry = builder.build(FemtoLevel::Info, [entry_ttl(1_000), meta_ttl(-3)]);
    assert_eq!(entry.ttl_entry, 90);
    assert_eq!(entry.ttl_meta, 0);
}

#[rstest]
fn default_ttls_apply_without_overrides(builder: EntryBuilder) {
    let entry = builder.build(FemtoLevel::Info, [LogArg::from("plain")]);
    assert_eq!((entry.ttl_entry, entry.ttl_meta), (30, 14));
}

#[test]
fn default_ttls_clamp_to_max_ttl() {
    let entry = EntryBuilder::new(1, 500, 400, small_limits())
        .build(FemtoLevel::Info, Vec::<LogArg>::new());
    assert_eq!((entry.ttl_entry, entry.ttl_meta), (90, 90));
}

#[rstest]
fn meta_stops_at_cap_without_scanning_further(builder: EntryBuilder) {
    let entry = builder.build(
        FemtoLevel::Info,
        [
            LogArg::meta([("k1", "v1"), ("k2", "v2"), ("k3", "v3")]),
            LogArg::meta([("k4", "v4")]),
        ],
    );
    assert_eq!(
        entry.meta,
        [
            ("k1".to_owned(), "v1".to_owned()),
            ("k2".to_owned(), "v2".to_owned())
        ]
    );
}

#[rstest]
fn meta_keys_and_values_truncate_independently(builder: EntryBuilder) {
    let entry = builder.build(
        FemtoLevel::Info,
        [LogArg::meta([("longer-key", "value-that-overflows")])],
    );
    assert_eq!(
        entry.meta,
        [("longer".to_owned(), "value-that".to_owned())]
    );
}

#[rstest]
fn metrics_are_capped(builder: EntryBuilder) {
    let entry = builder.build(
        FemtoLevel::Info,
        [LogArg::metrics([("latency_ms", 12), ("rows", -4), ("extra", 1)])],
    );
    assert_eq!(
        entry.metrics,
        [("latenc".to_owned(), 12), ("rows".to_owned(), -4)]
    );
}

#[rstest]
fn normalised_scalars_fill_message_then_tags(builder: EntryBuilder) {
    let entry = builder.build(
        FemtoLevel::Info,
        [
            LogArg::from(Option::<&str>::None),
            LogArg::from(true),
            LogArg::from(2.5),
        ],
    );
    assert_eq!(entry.message, "null");
    assert_eq!(entry.tags, ["true", "2.5"]);
}

#[rstest]
fn empty_string_leaves_message_open(builder: EntryBuilder) {
    let entry = builder.build(FemtoLevel::Info, [LogArg::from(""), LogArg::from("second")]);
    assert_eq!(entry.message, "second");
    assert!(entry.tags.is_empty());
}

#[test]
fn error_argument_supplies_message_and_trace() {
    let builder =
        EntryBuilder::new(1, 0, 0, small_limits()).with_frame_filter(FrameFilter::keep_all());
    let err = std::io::Error::other("connection refused");
    let error_arg = LogArg::error(&err);
    let LogArg::Error(ref captured) = error_arg else {
        panic!("expected an error argument");
    };
    let expected: Vec<_> = captured.frames.iter().take(3).map(|f| f.line).collect();

    let entry = builder.build(FemtoLevel::Error, [error_arg]);
    assert_eq!(entry.message, "connection refused");
    assert!(!entry.frames.is_empty());
    // The trace is the error's own snapshot rather than a fresh capture.
    assert_eq!(entry.frames.iter().map(|f| f.line).collect::<Vec<_>>(), expected);
}

#[test]
fn second_error_does_not_replace_trace() {
    let builder =
        EntryBuilder::new(1, 0, 0, small_limits()).with_frame_filter(FrameFilter::keep_all());
    let first = LogArg::Error(crate::log_arg::ErrorArg {
        message: "first".into(),
        frames: vec![StackFrame::new("a.rs", 1, "a")],
    });
    let second = LogArg::Error(crate::log_arg::ErrorArg {
        message: "second".into(),
        frames: vec![StackFrame::new("b.rs", 2, "b")],
    });
    let entry = builder.build(FemtoLevel::Error, [first, second]);
    assert_eq!(entry.frames, [StackFrame::new("a.rs", 1, "a")]);
    assert_eq!(entry.message, "first");
    assert_eq!(entry.tags, ["second"]);
}

#[test]
fn captures_trace_when_no_error_given() {
    let builder =
        EntryBuilder::new(1, 0, 0, small_limits()).with_frame_filter(FrameFilter::keep_all());
    let entry = builder.build(FemtoLevel::Info, [LogArg::from("no error here")]);
    assert!(!entry.frames.is_empty());
    assert!(entry.frames.len() <= 3);
    assert!(entry.frames.iter().all(|f| f.path.len() <= 12));
}

#[test]
fn frame_filter_drops_matching_frames() {
    let builder = EntryBuilder::new(1, 0, 0, small_limits())
        .with_frame_filter(FrameFilter::excluding_paths(["skip"]));
    let err = LogArg::Error(crate::log_arg::ErrorArg {
        message: "boom".into(),
        frames: vec![
            StackFrame::new("skip/me.rs", 1, "internal"),
            StackFrame::new("keep.rs", 2, "caller"),
        ],
    });
    let entry = builder.build(FemtoLevel::Error, [err]);
    assert_eq!(entry.frames, [StackFrame::new("keep.rs", 2, "caller")]);
}

fn arb_arg() -> impl Strategy<Value = LogArg> {
    prop_oneof![
        ".{0,40}".prop_map(LogArg::Scalar),
        proptest::collection::vec(".{0,20}", 0..8).prop_map(LogArg::Tags),
        proptest::collection::vec((".{0,12}", ".{0,30}"), 0..6).prop_map(LogArg::Meta),
        proptest::collection::vec((".{0,12}", any::<i16>()), 0..6).prop_map(LogArg::Metrics),
        any::<i64>().prop_map(category),
        any::<i64>().prop_map(entry_ttl),
        any::<i64>().prop_map(meta_ttl),
    ]
}

proptest! {
    #[test]
    fn built_entries_respect_every_cap(args in proptest::collection::vec(arb_arg(), 0..12)) {
        let limits = small_limits();
        let builder = EntryBuilder::new(3, 10, 10, limits.clone())
            .with_frame_filter(FrameFilter::keep_all());
        let entry = builder.build(FemtoLevel::Warning, args);
        prop_assert!(entry.message.len() <= limits.max_message_size);
        prop_assert!(entry.category <= limits.max_category);
        prop_assert!(entry.tags.len() <= limits.max_tags_count);
        prop_assert!(entry.tags.iter().all(|t| t.len() <= limits.max_tag_size));
        prop_assert!(entry.meta.len() <= limits.max_meta_count);
        prop_assert!(entry.meta.iter().all(|(k, v)|
            k.len() <= limits.max_meta_key_size && v.len() <= limits.max_meta_value_size
        ));
        prop_assert!(entry.metrics.len() <= limits.max_metric_count);
        prop_assert!(entry.frames.len() <= limits.max_stack_trace_count);
        prop_assert!(entry.ttl_entry <= limits.max_ttl && entry.ttl_meta <= limits.max_ttl);
    }
}
