//! Helpers for running a child process with a wall-clock bound.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::outcome::InvocationResult;
use crate::exit_codes;

/// How long readers may keep draining after the process group was killed.
///
/// A descendant that left the group can hold the pipes open indefinitely; past this
/// window its readers are detached and whatever was already collected is returned.
pub const KILL_GRACE: Duration = Duration::from_millis(500);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Decode the captured streams as text.
    pub fn into_result(self) -> InvocationResult {
        InvocationResult {
            exit_code: exit_code(self.status),
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            timed_out: self.timed_out,
        }
    }
}

/// Exit code for a finished child. Signal deaths map to `128 + signal` on Unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return exit_codes::SIGNAL_BASE + signal;
        }
    }
    exit_codes::FAILURE
}

enum Chunk {
    Stdout(Result<Vec<u8>>),
    Stderr(Result<Vec<u8>>),
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. The child gets its own process
/// group; on timeout the whole group is killed, the child is reaped, and the readers
/// are drained for at most [`KILL_GRACE`] before returning. The bound also covers
/// descendants that keep the output pipes open after the child itself exits.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let started = Instant::now();
    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };
    let pid = child.id();

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel();
    spawn_reader(stdout, tx.clone(), Chunk::Stdout);
    spawn_reader(stderr, tx, Chunk::Stderr);

    let mut timed_out = false;
    let mut grace_deadline = None;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing process group"
            );
            timed_out = true;
            terminate(&mut child, pid)?;
            grace_deadline = Some(Instant::now() + KILL_GRACE);
            child.wait().context("wait command after kill")?
        }
    };

    let deadline = started + timeout;
    let mut stdout = None;
    let mut stderr = None;
    while stdout.is_none() || stderr.is_none() {
        let wait_until = grace_deadline.unwrap_or(deadline);
        let chunk = match rx.recv_timeout(wait_until.saturating_duration_since(Instant::now())) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) if grace_deadline.is_some() => {
                warn!("output still open after kill, detaching readers");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("output still open after child exit, killing process group");
                timed_out = true;
                if let Err(e) = kill_process_group(pid) {
                    warn!(err = %e, "failed to kill process group");
                }
                grace_deadline = Some(Instant::now() + KILL_GRACE);
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("output reader thread panicked"));
            }
        };
        match chunk {
            Chunk::Stdout(out) => stdout = Some(out.context("read stdout")?),
            Chunk::Stderr(err) => stderr = Some(err.context("read stderr")?),
        }
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.unwrap_or_default(),
        stderr: stderr.unwrap_or_default(),
        timed_out,
    })
}

fn spawn_reader<R, F>(mut reader: R, tx: Sender<Chunk>, wrap: F)
where
    R: Read + Send + 'static,
    F: FnOnce(Result<Vec<u8>>) -> Chunk + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = reader
            .read_to_end(&mut buf)
            .map(|_| buf)
            .context("read output");
        // The receiver only goes away once run_command_with_timeout has bailed.
        let _ = tx.send(wrap(result));
    });
}

fn terminate(child: &mut Child, pid: u32) -> Result<()> {
    if let Err(e) = kill_process_group(pid) {
        warn!(err = %e, "failed to kill process group, killing child only");
        child.kill().context("kill command")?;
    }
    Ok(())
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(i32::try_from(pid).context("child pid out of range")?);
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(anyhow!(e)).context("killpg"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> Result<()> {
    Err(anyhow!("process groups are not supported on this platform"))
}
