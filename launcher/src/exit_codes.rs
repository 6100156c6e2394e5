//! Stable exit codes for the launcher's own failures.
//!
//! A child that runs to completion has its exit code relayed verbatim instead.

/// Child exited 0.
pub const OK: i32 = 0;
/// Timeout, launch failure, or invalid configuration.
pub const FAILURE: i32 = 1;
/// Offset added to the signal number for a child killed by a signal (shell convention).
pub const SIGNAL_BASE: i32 = 128;
