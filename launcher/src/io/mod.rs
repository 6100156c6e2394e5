//! Side-effecting operations: configuration files, credential lookup, and
//! child process execution.

pub mod config;
pub mod credential;
pub mod process;
