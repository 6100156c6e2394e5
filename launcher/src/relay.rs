//! Forward an invocation outcome to the launcher's own streams.

use std::io::Write;

use anyhow::{Context, Result, bail};

use crate::core::outcome::{Outcome, RunState};
use crate::core::relay_text::labeled_stderr;
use crate::exit_codes;

/// Write the outcome to `out`/`err` and return the exit code to finish with.
///
/// Completed runs forward the child's stdout verbatim and its stderr with a label.
/// Failed runs print one diagnostic line to `err` and return [`exit_codes::FAILURE`].
pub fn relay<O, E>(outcome: &Outcome, out: &mut O, err: &mut E) -> Result<i32>
where
    O: Write,
    E: Write,
{
    match &outcome.state {
        RunState::Running => bail!("cannot relay a run that has not finished"),
        RunState::Completed(code) => {
            if let Some(result) = &outcome.result {
                out.write_all(result.stdout.as_bytes())
                    .context("write stdout")?;
                if let Some(labeled) = labeled_stderr(&result.stderr) {
                    err.write_all(labeled.as_bytes()).context("write stderr")?;
                }
            }
            out.flush().context("flush stdout")?;
            err.flush().context("flush stderr")?;
            Ok(*code)
        }
        RunState::Failed(failure) => {
            writeln!(err, "{failure}").context("write diagnostic")?;
            err.flush().context("flush stderr")?;
            Ok(exit_codes::FAILURE)
        }
    }
}
