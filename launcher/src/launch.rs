//! Run the configured script exactly once and classify the outcome.
//!
//! The [`Runner`] trait decouples launch orchestration from actual process
//! spawning. Tests use recording runners that return canned results.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::core::outcome::{InvocationResult, Outcome};
use crate::io::config::LauncherConfig;
use crate::io::credential::{Credential, resolve_credential};
use crate::io::process::run_command_with_timeout;

/// Abstraction over process execution.
pub trait Runner {
    fn run(&self, cmd: Command, timeout: Duration) -> Result<InvocationResult>;
}

/// Runner that spawns a real child process.
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, cmd: Command, timeout: Duration) -> Result<InvocationResult> {
        let output = run_command_with_timeout(cmd, timeout).context("run script")?;
        Ok(output.into_result())
    }
}

/// Script path as the child sees it. Relative paths are taken from `workdir`.
pub fn script_path(cfg: &LauncherConfig) -> PathBuf {
    if cfg.script_path.is_absolute() {
        cfg.script_path.clone()
    } else {
        cfg.workdir.join(&cfg.script_path)
    }
}

/// Build the child command: inherited environment plus the credential variable.
pub fn build_command(cfg: &LauncherConfig, script: &Path, credential: &Credential) -> Command {
    let mut cmd = match cfg.interpreter() {
        Some(interpreter) => {
            let mut cmd = Command::new(interpreter);
            cmd.arg(script);
            cmd
        }
        None => Command::new(script),
    };
    cmd.current_dir(&cfg.workdir)
        .env(&cfg.credential.child_env, credential.expose());
    cmd
}

fn preflight(cfg: &LauncherConfig) -> Result<PathBuf> {
    let workdir = fs::metadata(&cfg.workdir)
        .with_context(|| format!("working directory {}", cfg.workdir.display()))?;
    if !workdir.is_dir() {
        bail!("working directory {} is not a directory", cfg.workdir.display());
    }
    let script = script_path(cfg);
    let meta = fs::metadata(&script).with_context(|| format!("script {}", script.display()))?;
    if !meta.is_file() {
        bail!("script {} is not a regular file", script.display());
    }
    Ok(script)
}

/// Launch the script once. Every failure is folded into the returned outcome.
#[instrument(skip_all, fields(script = %cfg.script_path.display(), timeout_secs = cfg.timeout_secs))]
pub fn launch<R, F>(cfg: &LauncherConfig, runner: &R, lookup: F) -> Outcome
where
    R: Runner,
    F: Fn(&str) -> Option<String>,
{
    match try_launch(cfg, runner, lookup) {
        Ok(outcome) => {
            info!(exit_code = outcome.exit_code(), "script finished");
            outcome
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "launch failed");
            Outcome::launch_failed(&err)
        }
    }
}

fn try_launch<R, F>(cfg: &LauncherConfig, runner: &R, lookup: F) -> Result<Outcome>
where
    R: Runner,
    F: Fn(&str) -> Option<String>,
{
    let script = preflight(cfg)?;
    let credential = resolve_credential(&cfg.credential, lookup)?;
    let cmd = build_command(cfg, &script, &credential);
    info!(workdir = %cfg.workdir.display(), "starting script");
    let result = runner.run(cmd, cfg.timeout())?;
    Outcome::from_result(result, cfg.timeout())
}
