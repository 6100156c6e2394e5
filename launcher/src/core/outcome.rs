//! Invocation outcome model and the run state machine.

use std::time::Duration;

use anyhow::{Result, bail};
use thiserror::Error;

use crate::exit_codes;

/// Captured result of a child that ran to completion or was stopped at the timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

/// Reason an invocation did not complete.
///
/// The `Display` text is the diagnostic printed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("Script execution timed out after {} seconds", .timeout.as_secs())]
    TimedOut { timeout: Duration },
    #[error("Error executing script: {reason}")]
    Launch { reason: String },
}

impl Failure {
    pub fn launch(err: &anyhow::Error) -> Self {
        Self::Launch {
            reason: format!("{err:#}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Completed(i32),
    Failed(Failure),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running)
    }

    /// Move from `Running` into a terminal state.
    ///
    /// Terminal states are final: finishing twice is an error.
    pub fn finish(&mut self, next: RunState) -> Result<()> {
        if self.is_terminal() {
            bail!("run already finished as {:?}", self);
        }
        if !next.is_terminal() {
            bail!("cannot finish a run into Running");
        }
        *self = next;
        Ok(())
    }

    /// Process exit code the launcher reports for this state.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunState::Running => None,
            RunState::Completed(code) => Some(*code),
            RunState::Failed(_) => Some(exit_codes::FAILURE),
        }
    }
}

/// Final outcome of one launch: the terminal state plus whatever was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub state: RunState,
    pub result: Option<InvocationResult>,
}

impl Outcome {
    /// Build the outcome for a captured result.
    ///
    /// A timed-out result becomes `Failed(TimedOut)` regardless of the status the
    /// killed child reported.
    pub fn from_result(result: InvocationResult, timeout: Duration) -> Result<Self> {
        let mut state = RunState::Running;
        if result.timed_out {
            state.finish(RunState::Failed(Failure::TimedOut { timeout }))?;
        } else {
            state.finish(RunState::Completed(result.exit_code))?;
        }
        Ok(Self {
            state,
            result: Some(result),
        })
    }

    pub fn launch_failed(err: &anyhow::Error) -> Self {
        Self {
            state: RunState::Failed(Failure::launch(err)),
            result: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code().unwrap_or(exit_codes::FAILURE)
    }
}
