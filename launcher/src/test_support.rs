//! Test-only helpers for writing throwaway scripts and matching configs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::io::config::LauncherConfig;

/// Temporary working directory holding generated shell scripts.
pub struct ScriptDir {
    temp: TempDir,
}

impl ScriptDir {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write an executable `#!/bin/sh` script with `body` and return its path.
    pub fn write_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("chmod {}", path.display()))?;
        }
        Ok(path)
    }

    /// Write a non-executable file.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Config that runs `name` from this directory with `bash` and a 5 second timeout.
    pub fn config(&self, name: &str) -> LauncherConfig {
        LauncherConfig {
            script_path: self.temp.path().join(name),
            workdir: self.temp.path().to_path_buf(),
            interpreter: "bash".to_string(),
            timeout_secs: 5,
            ..LauncherConfig::default()
        }
    }
}
