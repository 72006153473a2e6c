//! Engine configuration stored in `testsmith.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Engine configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Give up after this many visits to any single workflow node.
    pub max_node_attempts: u32,

    /// Timeout for one generation backend call, in seconds.
    pub generation_timeout_secs: u64,

    /// Timeout for one test execution (and provisioning commands), in seconds.
    pub test_timeout_secs: u64,

    /// Truncate captured process output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Retry a transient backend failure this many times before giving up.
    pub gateway_retries: u32,

    /// Base backoff between gateway retries, in milliseconds (linear).
    pub gateway_backoff_ms: u64,

    /// Sampling configuration forwarded to the generation backend.
    pub top_p: f64,
    pub temperature: f64,

    /// Model identifier override. Falls back to the `DASHSCOPE_MODEL`
    /// environment variable, then the backend default.
    pub model: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_node_attempts: 5,
            generation_timeout_secs: 120,
            test_timeout_secs: 300,
            output_limit_bytes: 100_000,
            gateway_retries: 3,
            gateway_backoff_ms: 500,
            top_p: 0.8,
            temperature: 0.2,
            model: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_node_attempts == 0 {
            return Err(anyhow!("max_node_attempts must be > 0"));
        }
        if self.generation_timeout_secs == 0 {
            return Err(anyhow!("generation_timeout_secs must be > 0"));
        }
        if self.test_timeout_secs == 0 {
            return Err(anyhow!("test_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.gateway_retries == 0 {
            return Err(anyhow!("gateway_retries must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(anyhow!("top_p must be within [0, 1]"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("temperature must be within [0, 2]"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
