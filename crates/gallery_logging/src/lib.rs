#![deny(missing_docs)]
//! Shared logging utilities for the gallery workspace.
//!
//! This crate provides the `gallery_*` logging macros used by the core, engine
//! and app crates, plus a minimal test initializer for the global logger.
//! Backends are always `simplelog`; callers only ever see the `log` facade.

use std::cell::Cell;

thread_local! {
    /// Thread-local frame counter of the driving loop.
    static FRAME: Cell<u64> = const { Cell::new(0) };
}

/// Sets the current frame number for the calling thread.
/// The app's driving loop calls this once per scroll step.
pub fn set_frame(frame: u64) {
    FRAME.with(|v| v.set(frame));
}

/// Returns the frame number set on the calling thread, or 0.
pub fn frame() -> u64 {
    FRAME.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! gallery_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a terminal logger for use in tests.
///
/// Safe to call from every test: it no-ops once a logger is installed.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
