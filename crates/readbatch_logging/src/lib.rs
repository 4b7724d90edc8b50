#![deny(missing_docs)]
//! Shared logging utilities for the readbatch workspace.
//!
//! This crate provides the `batch_*` logging macros used across the codebase,
//! a helper for keeping secrets out of log lines, and a minimal test
//! initializer for the global logger.
//!
//! Every macro accepts an optional `task = <id>;` prefix so that lines about a
//! single account read `[task_alice_1700000000000_0] login ok`.

#[doc(hidden)]
pub use log as __log;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! batch_trace {
    (task = $task:expr; $($arg:tt)*) => {{
        $crate::__log::trace!("[{}] {}", $task, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! batch_debug {
    (task = $task:expr; $($arg:tt)*) => {{
        $crate::__log::debug!("[{}] {}", $task, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! batch_info {
    (task = $task:expr; $($arg:tt)*) => {{
        $crate::__log::info!("[{}] {}", $task, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! batch_warn {
    (task = $task:expr; $($arg:tt)*) => {{
        $crate::__log::warn!("[{}] {}", $task, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! batch_error {
    (task = $task:expr; $($arg:tt)*) => {{
        $crate::__log::error!("[{}] {}", $task, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Returns at most the first `keep` characters of `secret` followed by `...`.
///
/// Used for session tokens, which are handy to correlate in logs but must not
/// be written out in full.
pub fn redact(secret: &str, keep: usize) -> String {
    let mut shown: String = secret.chars().take(keep).collect();
    if secret.chars().count() > keep {
        shown.push_str("...");
    }
    shown
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test binary thread may have won the race.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
