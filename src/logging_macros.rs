//! Variadic logging macros.
//!
//! Each macro converts every argument into a [`LogArg`](crate::LogArg) with
//! `From` and forwards the list to the matching [`FemtoLogger`] method, so
//! call sites can mix strings, numbers, maps, sequences and overrides
//! freely. The macros evaluate to the rendered identifier.
//!
//! The `femto_` prefix keeps them apart from the `log` crate's macros.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::collections::BTreeMap;
//! use femtowire::{category, femto_info};
//!
//! let id = femto_info!(logger, "order %d created", 123456, BTreeMap::from([("foo", "bar")]));
//! femto_warning!(logger, "disk almost full", category(4));
//! ```
//!
//! [`FemtoLogger`]: crate::FemtoLogger

#[doc(hidden)]
#[macro_export]
macro_rules! __femto_log_impl {
    ($logger:expr, $method:ident $(, $arg:expr)* $(,)?) => {{
        let args: ::std::vec::Vec<$crate::LogArg> =
            ::std::vec![$($crate::LogArg::from($arg)),*];
        $logger.$method(args)
    }};
}

/// Log at severity 0 (emergency).
#[macro_export]
macro_rules! femto_emerg {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, emerg $(, $arg)*)
    };
}

/// Log at severity 1 (alert).
#[macro_export]
macro_rules! femto_alert {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, alert $(, $arg)*)
    };
}

/// Log at severity 2 (critical).
#[macro_export]
macro_rules! femto_crit {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, crit $(, $arg)*)
    };
}

/// Log at severity 3 (error).
#[macro_export]
macro_rules! femto_err {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, err $(, $arg)*)
    };
}

/// Log at severity 4 (warning).
#[macro_export]
macro_rules! femto_warning {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, warning $(, $arg)*)
    };
}

/// Log at severity 5 (notice).
#[macro_export]
macro_rules! femto_notice {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, notice $(, $arg)*)
    };
}

/// Log at severity 6 (informational).
#[macro_export]
macro_rules! femto_info {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, info $(, $arg)*)
    };
}

/// Log at severity 7 (debug).
#[macro_export]
macro_rules! femto_debug {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::__femto_log_impl!($logger, debug $(, $arg)*)
    };
}
