//! Stack snapshot capture and frame filtering.
//!
//! Snapshots are taken with the `backtrace` crate and flattened into
//! [`StackFrame`] values, innermost call first. A [`FrameFilter`] then removes
//! frames that belong to the logging machinery itself so an entry's trace
//! starts at the caller.
//!
//! # Example
//!
//! ```rust
//! use femtowire::trace::{FrameFilter, StackFrame};
//!
//! let frames = vec![
//!     StackFrame::new("src/entry.rs", 40, "femtowire::entry::EntryBuilder::build"),
//!     StackFrame::new("src/main.rs", 10, "app::main"),
//! ];
//! let kept = FrameFilter::default().apply(frames);
//! assert_eq!(kept.len(), 1);
//! assert_eq!(kept[0].path, "src/main.rs");
//! ```

use std::{fmt, sync::Arc};

use backtrace::Backtrace;

/// Function-name fragments identifying frames inside the logging machinery.
pub const LOGGING_INFRA_PATTERNS: &[&str] = &[
    "backtrace::",
    "femtowire::trace::",
    "femtowire::log_arg::",
    "femtowire::entry::",
    "femtowire::logger::",
];

const UNKNOWN_PATH: &str = "<unknown>";

/// One frame of a captured call stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Source path, or the symbol name when no debug info is available.
    pub path: String,
    pub line: u32,
    /// Demangled function name; empty when unresolved.
    pub function: String,
}

impl StackFrame {
    pub fn new(path: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            function: function.into(),
        }
    }
}

/// Snapshot the current call stack, innermost frame first.
///
/// Inlined calls are expanded into separate frames. Frames with no symbol
/// information are skipped.
pub fn capture_frames() -> Vec<StackFrame> {
    let backtrace = Backtrace::new();
    backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(|symbol| {
            let function = symbol.name().map(|n| n.to_string()).unwrap_or_default();
            let path = match symbol.filename() {
                Some(file) => file.display().to_string(),
                None if !function.is_empty() => function.clone(),
                None => UNKNOWN_PATH.to_owned(),
            };
            StackFrame {
                path,
                line: symbol.lineno().unwrap_or_default(),
                function,
            }
        })
        .collect()
}

type Predicate = dyn Fn(&StackFrame) -> bool + Send + Sync;

/// Predicate deciding which captured frames are kept.
///
/// The default filter drops frames whose function matches
/// [`LOGGING_INFRA_PATTERNS`].
#[derive(Clone)]
pub struct FrameFilter {
    keep: Arc<Predicate>,
}

impl FrameFilter {
    /// Keep frames for which `keep` returns `true`.
    pub fn new<F>(keep: F) -> Self
    where
        F: Fn(&StackFrame) -> bool + Send + Sync + 'static,
    {
        Self {
            keep: Arc::new(keep),
        }
    }

    pub fn keep_all() -> Self {
        Self::new(|_| true)
    }

    /// Drop frames whose function name contains any of `patterns`.
    pub fn excluding_functions<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        Self::new(move |frame| !patterns.iter().any(|p| frame.function.contains(p.as_str())))
    }

    /// Drop frames whose path contains any of `patterns`.
    pub fn excluding_paths<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        Self::new(move |frame| !patterns.iter().any(|p| frame.path.contains(p.as_str())))
    }

    /// Keep only frames accepted by both filters.
    pub fn and(self, other: FrameFilter) -> Self {
        Self::new(move |frame| (self.keep)(frame) && (other.keep)(frame))
    }

    pub fn keeps(&self, frame: &StackFrame) -> bool {
        (self.keep)(frame)
    }

    pub fn apply(&self, frames: Vec<StackFrame>) -> Vec<StackFrame> {
        frames.into_iter().filter(|f| self.keeps(f)).collect()
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::excluding_functions(LOGGING_INFRA_PATTERNS.iter().copied())
    }
}

impl fmt::Debug for FrameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameFilter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn frames() -> Vec<StackFrame> {
        vec![
            StackFrame::new("backtrace/src/capture.rs", 1, "backtrace::capture::Backtrace::new"),
            StackFrame::new("src/trace.rs", 2, "femtowire::trace::capture_frames"),
            StackFrame::new("src/logger.rs", 3, "<femtowire::logger::FemtoLogger>::info"),
            StackFrame::new("src/orders.rs", 44, "shop::orders::create"),
            StackFrame::new("src/main.rs", 9, "shop::main"),
        ]
    }

    #[rstest]
    fn default_filter_drops_logging_frames(frames: Vec<StackFrame>) {
        let kept = FrameFilter::default().apply(frames);
        let paths: Vec<_> = kept.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["src/orders.rs", "src/main.rs"]);
    }

    #[rstest]
    fn custom_predicates_compose(frames: Vec<StackFrame>) {
        let filter = FrameFilter::default().and(FrameFilter::excluding_paths(["main.rs"]));
        let kept = filter.apply(frames);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line, 44);
    }

    #[rstest]
    fn keep_all_preserves_order(frames: Vec<StackFrame>) {
        let kept = FrameFilter::keep_all().apply(frames.clone());
        assert_eq!(kept, frames);
    }

    #[test]
    fn captures_the_current_stack() {
        let frames = capture_frames();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| !f.path.is_empty()));
    }
}
