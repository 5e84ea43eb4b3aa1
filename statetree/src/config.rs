//! Store configuration, optionally loaded from a TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::path::SEPARATOR;

/// Store configuration (TOML).
///
/// Missing fields take their default values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Action type dispatched against the absent state to seed the tree.
    pub init_action: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            init_action: "@@statetree/INIT".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.init_action.trim().is_empty() {
            return Err(anyhow!("init_action must be non-empty"));
        }
        // Every composed action type starts with the separator.
        if self.init_action.starts_with(SEPARATOR) {
            return Err(anyhow!(
                "init_action must not start with '{SEPARATOR}': {}",
                self.init_action
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `StoreConfig::default()`.
pub fn load_config(path: &Path) -> Result<StoreConfig> {
    if !path.exists() {
        let cfg = StoreConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: StoreConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &StoreConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
