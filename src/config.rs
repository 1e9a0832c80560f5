// Configuration: which local files map to which remote display names,
// where the API key comes from, and how an inventory failure is treated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::Credential;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "POSTMAN_API_KEY";

/// One local file and the remote display name it is synced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub file: PathBuf,
    pub name: String,
}

impl Target {
    pub fn new(file: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Target {
            file: file.into(),
            name: name.into(),
        }
    }

    /// The file path, joined onto `dir` when relative.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file)
    }
}

/// The static sync mapping: one collection and an ordered list of
/// environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub collection: Target,
    #[serde(default)]
    pub environments: Vec<Target>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            collection: Target::new("syllaby-api-collection.json", "Syllaby API Collection"),
            environments: vec![
                Target::new("syllaby-local-environment.json", "Syllaby Local Development"),
                Target::new("syllaby-development-environment.json", "Syllaby Development"),
                Target::new("syllaby-staging-environment.json", "Syllaby Staging"),
                Target::new("syllaby-production-environment.json", "Syllaby Production"),
            ],
        }
    }
}

impl SyncConfig {
    /// Load a mapping from a JSON file of the same shape as this struct.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SyncConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), environments = config.environments.len(), "loaded sync config");
        Ok(config)
    }

    /// Every configured file, collection first.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.collection.file.as_path())
            .chain(self.environments.iter().map(|e| e.file.as_path()))
    }

    /// Check every configured file exists under `dir` before anything is
    /// sent. The first missing one is reported.
    pub fn preflight(&self, dir: &Path) -> Result<()> {
        for file in self.files() {
            let path = dir.join(file);
            if !path.exists() {
                anyhow::bail!("File not found: {}", path.display());
            }
        }
        Ok(())
    }
}

/// What to do when the remote inventory cannot be listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchFailureMode {
    /// Carry on as if nothing exists remotely. Everything gets created,
    /// which duplicates resources that were in fact already there.
    #[default]
    Open,
    /// Abort the run.
    Closed,
}

/// Resolve the API key: explicit argument, then `POSTMAN_API_KEY`, then a
/// `POSTMAN_API_KEY=` line in `<dir>/.env`.
pub fn resolve_credential(arg: Option<&str>, env: Option<&str>, dir: &Path) -> Option<Credential> {
    arg.and_then(Credential::new)
        .or_else(|| env.and_then(Credential::new))
        .or_else(|| {
            let text = std::fs::read_to_string(dir.join(".env")).ok()?;
            dotenv_value(&text, API_KEY_VAR).and_then(Credential::new)
        })
}

/// Find `key=value` in dotenv-formatted text. Comments, blank lines and
/// an optional `export ` prefix are tolerated; surrounding quotes are
/// stripped.
fn dotenv_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim().trim_start_matches("export ").trim() == key)
        .map(|(_, v)| v.trim().trim_matches(|c| c == '"' || c == '\''))
}
