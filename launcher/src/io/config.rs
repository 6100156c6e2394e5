//! Launcher configuration: TOML file, environment overrides, CLI overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "LAUNCHER_CONFIG";
pub const SCRIPT_ENV: &str = "LAUNCHER_SCRIPT";
pub const WORKDIR_ENV: &str = "LAUNCHER_WORKDIR";
pub const INTERPRETER_ENV: &str = "LAUNCHER_INTERPRETER";
pub const TIMEOUT_SECS_ENV: &str = "LAUNCHER_TIMEOUT_SECS";
pub const CREDENTIAL_FILE_ENV: &str = "LAUNCHER_CREDENTIAL_FILE";

/// Launcher configuration (TOML).
///
/// Missing fields default to the fixed upload-script values.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Script to invoke.
    pub script_path: PathBuf,

    /// Working directory for the child.
    pub workdir: PathBuf,

    /// Program that runs the script. Empty runs the script as an executable.
    pub interpreter: String,

    /// Wall-clock bound on the child in seconds.
    pub timeout_secs: u64,

    pub credential: CredentialConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialConfig {
    /// Variable the child sees the credential under.
    pub child_env: String,

    /// Variable the credential is read from in the launcher's own environment.
    pub source_env: String,

    /// Secret file holding the credential on its first line. Wins over `source_env`.
    pub file: Option<PathBuf>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            child_env: "GITHUB_TOKEN".to_string(),
            source_env: "GITHUB_TOKEN".to_string(),
            file: None,
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            script_path: PathBuf::from("/project/workspace/upload2.sh"),
            workdir: PathBuf::from("/project/workspace"),
            interpreter: "bash".to_string(),
            timeout_secs: 180,
            credential: CredentialConfig::default(),
        }
    }
}

impl LauncherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.script_path.as_os_str().is_empty() {
            return Err(anyhow!("script_path must not be empty"));
        }
        if self.workdir.as_os_str().is_empty() {
            return Err(anyhow!("workdir must not be empty"));
        }
        validate_env_name("credential.child_env", &self.credential.child_env)?;
        validate_env_name("credential.source_env", &self.credential.source_env)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Interpreter program, or `None` when the script is executed directly.
    pub fn interpreter(&self) -> Option<&str> {
        let trimmed = self.interpreter.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

fn validate_env_name(field: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow!("{field} must not be empty"));
    }
    if name.contains('=') || name.contains('\0') {
        return Err(anyhow!("{field} must not contain '=' or NUL"));
    }
    Ok(())
}

/// Values layered over the file config. `None` keeps the lower layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub script_path: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub interpreter: Option<String>,
    pub timeout_secs: Option<u64>,
    pub credential_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Read `LAUNCHER_*` overrides through `lookup` (usually `std::env::var`).
    pub fn from_env<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup(TIMEOUT_SECS_ENV) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("parse {TIMEOUT_SECS_ENV}={raw:?}"))?,
            ),
            None => None,
        };
        Ok(Self {
            script_path: lookup(SCRIPT_ENV).map(PathBuf::from),
            workdir: lookup(WORKDIR_ENV).map(PathBuf::from),
            interpreter: lookup(INTERPRETER_ENV),
            timeout_secs,
            credential_file: lookup(CREDENTIAL_FILE_ENV).map(PathBuf::from),
        })
    }

    /// Layer `other` on top of `self`.
    pub fn merge(self, other: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            script_path: other.script_path.or(self.script_path),
            workdir: other.workdir.or(self.workdir),
            interpreter: other.interpreter.or(self.interpreter),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            credential_file: other.credential_file.or(self.credential_file),
        }
    }

    pub fn apply(self, mut base: LauncherConfig) -> Result<LauncherConfig> {
        if let Some(script_path) = self.script_path {
            base.script_path = script_path;
        }
        if let Some(workdir) = self.workdir {
            base.workdir = workdir;
        }
        if let Some(interpreter) = self.interpreter {
            base.interpreter = interpreter;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            base.timeout_secs = timeout_secs;
        }
        if let Some(file) = self.credential_file {
            base.credential.file = Some(file);
        }
        base.validate()?;
        Ok(base)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LauncherConfig::default()`.
pub fn load_config(path: &Path) -> Result<LauncherConfig> {
    if !path.exists() {
        let cfg = LauncherConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LauncherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the effective config.
///
/// Layers, lowest first: defaults, the TOML file (`config_path` or `LAUNCHER_CONFIG`),
/// `LAUNCHER_*` environment overrides, then `cli`. A named config file must exist.
pub fn resolve_config<F>(
    config_path: Option<&Path>,
    cli: ConfigOverrides,
    lookup: F,
) -> Result<LauncherConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from));
    let base = match &path {
        Some(path) => {
            if !path.exists() {
                bail!("config {} not found", path.display());
            }
            load_config(path)?
        }
        None => LauncherConfig::default(),
    };
    ConfigOverrides::from_env(&lookup)?.merge(cli).apply(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, LauncherConfig::default());
        assert_eq!(cfg.timeout(), Duration::from_secs(180));
        assert_eq!(cfg.interpreter(), Some("bash"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("launcher.toml");
        fs::write(
            &path,
            "timeout_secs = 5\n[credential]\nsource_env = \"UPLOAD_TOKEN\"\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.credential.source_env, "UPLOAD_TOKEN");
        assert_eq!(cfg.credential.child_env, "GITHUB_TOKEN");
        assert_eq!(cfg.script_path, PathBuf::from("/project/workspace/upload2.sh"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("launcher.toml");
        fs::write(&path, "timeout_secs = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn env_name_with_equals_is_rejected() {
        let mut cfg = LauncherConfig::default();
        cfg.credential.child_env = "A=B".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_interpreter_runs_script_directly() {
        let cfg = LauncherConfig {
            interpreter: "  ".to_string(),
            ..LauncherConfig::default()
        };
        assert_eq!(cfg.interpreter(), None);
    }

    #[test]
    fn env_overrides_parse() {
        let overrides = ConfigOverrides::from_env(lookup_from(&[
            (SCRIPT_ENV, "/tmp/run.sh"),
            (TIMEOUT_SECS_ENV, " 7 "),
        ]))
        .expect("overrides");
        assert_eq!(overrides.script_path, Some(PathBuf::from("/tmp/run.sh")));
        assert_eq!(overrides.timeout_secs, Some(7));
        assert_eq!(overrides.workdir, None);
    }

    #[test]
    fn env_timeout_must_be_numeric() {
        let err = ConfigOverrides::from_env(lookup_from(&[(TIMEOUT_SECS_ENV, "soon")]))
            .expect_err("invalid");
        assert!(err.to_string().contains(TIMEOUT_SECS_ENV));
    }

    #[test]
    fn later_layer_wins() {
        let env = ConfigOverrides {
            script_path: Some(PathBuf::from("/env.sh")),
            timeout_secs: Some(10),
            ..ConfigOverrides::default()
        };
        let cli = ConfigOverrides {
            timeout_secs: Some(3),
            ..ConfigOverrides::default()
        };
        let cfg = env
            .merge(cli)
            .apply(LauncherConfig::default())
            .expect("apply");
        assert_eq!(cfg.script_path, PathBuf::from("/env.sh"));
        assert_eq!(cfg.timeout_secs, 3);
        assert_eq!(cfg.workdir, PathBuf::from("/project/workspace"));
    }

    #[test]
    fn resolve_without_anything_is_default() {
        let cfg = resolve_config(None, ConfigOverrides::default(), |_| None).expect("resolve");
        assert_eq!(cfg, LauncherConfig::default());
    }

    #[test]
    fn resolve_layers_file_env_and_cli() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("launcher.toml");
        fs::write(
            &path,
            "script_path = \"/file.sh\"\nworkdir = \"/file\"\ntimeout_secs = 60\n",
        )
        .expect("write");
        let path_str = path.display().to_string();
        let lookup = lookup_from(&[
            (CONFIG_PATH_ENV, path_str.as_str()),
            (WORKDIR_ENV, "/env"),
            (TIMEOUT_SECS_ENV, "30"),
        ]);
        let cli = ConfigOverrides {
            timeout_secs: Some(2),
            ..ConfigOverrides::default()
        };

        let cfg = resolve_config(None, cli, lookup).expect("resolve");
        assert_eq!(cfg.script_path, PathBuf::from("/file.sh"));
        assert_eq!(cfg.workdir, PathBuf::from("/env"));
        assert_eq!(cfg.timeout_secs, 2);
    }

    #[test]
    fn resolve_named_missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("missing.toml");
        let err = resolve_config(Some(&missing), ConfigOverrides::default(), |_| None)
            .expect_err("missing");
        assert!(err.to_string().contains("not found"));
    }
}
