//! Pure, deterministic launcher logic.
//!
//! Everything here is free of I/O: the invocation outcome model, its state
//! machine, and the text the launcher prints around relayed output.

pub mod outcome;
pub mod relay_text;
