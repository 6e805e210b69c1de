//! Logging macros prefixing messages with the simulated time.
//!
//! The macros take a [`SimulationContext`](crate::SimulationContext) (or an
//! expression exposing `name()` and `time()`) so every line carries the
//! component name as the log target and the colored simulation time.

/// Formats the simulated time for log output.
#[macro_export]
macro_rules! sim_time {
    ($ctx:expr) => {
        $crate::colored::Colorize::blue(format!("{:.3}", $ctx.time()).as_str())
    };
}

/// Logs an error message with the simulated time.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => {
        log::error!(target: $ctx.name(), "[{}] {}", $crate::sim_time!($ctx), format!($($arg)+))
    };
}

/// Logs an info message with the simulated time.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => {
        log::info!(target: $ctx.name(), "[{}] {}", $crate::sim_time!($ctx), format!($($arg)+))
    };
}

/// Logs a debug message with the simulated time.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => {
        log::debug!(target: $ctx.name(), "[{}] {}", $crate::sim_time!($ctx), format!($($arg)+))
    };
}

/// Logs a trace message with the simulated time.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => {
        log::trace!(target: $ctx.name(), "[{}] {}", $crate::sim_time!($ctx), format!($($arg)+))
    };
}
