//! Run the upload script with a credential, a timeout, and relayed output.
//!
//! With no arguments the launcher runs `bash /project/workspace/upload2.sh` from
//! `/project/workspace` with a 180 second bound, handing `GITHUB_TOKEN` from its
//! own environment to the child.

use std::io::{stderr, stdout};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use launcher::exit_codes;
use launcher::io::config::{ConfigOverrides, resolve_config};
use launcher::launch::{ProcessRunner, launch};
use launcher::logging;
use launcher::relay::relay;

#[derive(Parser, Debug)]
#[command(
    name = "launcher",
    version,
    about = "Run one script under a timeout and relay its output and exit status"
)]
struct Cli {
    /// TOML config file (defaults to `LAUNCHER_CONFIG` if set).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Script to run.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Working directory for the script.
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Program that runs the script.
    #[arg(long, value_name = "PROG", conflicts_with = "no_interpreter")]
    interpreter: Option<String>,

    /// Execute the script directly instead of through an interpreter.
    #[arg(long)]
    no_interpreter: bool,

    /// Wall-clock bound on the script, in seconds.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let interpreter = if self.no_interpreter {
            Some(String::new())
        } else {
            self.interpreter.clone()
        };
        ConfigOverrides {
            script_path: self.script.clone(),
            workdir: self.workdir.clone(),
            interpreter,
            timeout_secs: self.timeout_secs,
            credential_file: None,
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            err.print().ok();
            return Ok(exit_codes::FAILURE);
        }
    };
    let lookup = |key: &str| std::env::var(key).ok();
    let cfg = resolve_config(cli.config.as_deref(), cli.overrides(), lookup)?;

    let outcome = launch(&cfg, &ProcessRunner, lookup);
    relay(&outcome, &mut stdout().lock(), &mut stderr().lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_no_args() {
        let cli = Cli::parse_from(["launcher"]);
        assert_eq!(cli.overrides(), ConfigOverrides::default());
    }

    #[test]
    fn parse_no_interpreter() {
        let cli = Cli::parse_from(["launcher", "--no-interpreter", "--timeout-secs", "9"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.interpreter.as_deref(), Some(""));
        assert_eq!(overrides.timeout_secs, Some(9));
    }

    #[test]
    fn interpreter_conflicts_with_no_interpreter() {
        let res = Cli::try_parse_from(["launcher", "--interpreter", "sh", "--no-interpreter"]);
        assert!(res.is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["launcher", "--timeout-secs", "0"]).is_err());
    }

    #[test]
    fn positional_args_are_rejected() {
        assert!(Cli::try_parse_from(["launcher", "extra"]).is_err());
    }
}
