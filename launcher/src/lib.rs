//! Bounded launcher for a single external script.
//!
//! The launcher hands a credential to the child through its environment, runs the
//! script once under a wall-clock timeout, and relays the child's output and exit
//! status as its own. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (outcome model, state machine, relay text).
//! - **[`io`]**: Side-effecting operations (config files, credential lookup, process execution).
//!
//! [`launch`] and [`relay`] coordinate the two to implement the binary.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod launch;
pub mod logging;
pub mod relay;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
