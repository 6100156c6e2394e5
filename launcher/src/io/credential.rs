//! Credential lookup for the child's environment.
//!
//! The credential comes from a secret file or the launcher's own environment.
//! There is no built-in fallback value.

use std::fmt;
use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::io::config::CredentialConfig;

/// Secret token handed to the child. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(anyhow!("credential is empty"));
        }
        if value.contains('\0') {
            return Err(anyhow!("credential contains NUL"));
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Resolve the credential from the configured file, else from `source_env`.
pub fn resolve_credential<F>(cfg: &CredentialConfig, lookup: F) -> Result<Credential>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = &cfg.file {
        debug!(path = %path.display(), "reading credential file");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("credential not available: read {}", path.display()))?;
        let first = contents.lines().next().unwrap_or_default().trim();
        return Credential::new(first)
            .with_context(|| format!("credential not available: {}", path.display()));
    }

    debug!(source_env = %cfg.source_env, "reading credential from environment");
    let value = lookup(&cfg.source_env)
        .ok_or_else(|| anyhow!("credential not available: {} is not set", cfg.source_env))?;
    Credential::new(value)
        .with_context(|| format!("credential not available: {}", cfg.source_env))
}
