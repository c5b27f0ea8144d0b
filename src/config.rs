use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub contact_auditor: ContactAuditorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactAuditorConfig {
    pub db: DbConfig,
    #[serde(default)]
    pub forbidden_mail_domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfig {
    pub db_path: Option<PathBuf>,
    /// File whose contents name the database; keeps the location out of the
    /// main config.
    pub db_connect_file: Option<PathBuf>,
    /// Dirty reads against a live store are accepted for this offline pass.
    #[serde(default = "default_read_uncommitted")]
    pub read_uncommitted: bool,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_read_uncommitted() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("error reading config file: {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("couldn't parse config file: {}", path.display()))
    }
}

impl DbConfig {
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match (&self.db_path, &self.db_connect_file) {
            (Some(path), None) => Ok(path.clone()),
            (None, Some(connect_file)) => {
                let raw = fs::read_to_string(connect_file).with_context(|| {
                    format!("failed to read db connect file: {}", connect_file.display())
                })?;
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    bail!("db connect file is empty: {}", connect_file.display());
                }
                Ok(PathBuf::from(trimmed))
            }
            (Some(_), Some(_)) => bail!("set only one of dbPath and dbConnectFile"),
            (None, None) => bail!("one of dbPath or dbConnectFile is required"),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
