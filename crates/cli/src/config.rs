//! Loading `backlog-sync.toml`.

use std::path::Path;

use anyhow::Context;
use backlog::SyncConfig;
use serde::Deserialize;
use tracker::TrackerConfig;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "backlog-sync.toml";

/// The whole configuration file: the `[service]` section plus the
/// service-agnostic `[fields]`, `[limits]`, `[retry]` and `[ordering]`
/// sections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CliConfig {
    pub service: TrackerConfig,
    #[serde(flatten)]
    pub sync: SyncConfig,
}

impl CliConfig {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config: CliConfig = toml::from_str(raw).context("invalid configuration")?;
        config.service.validate()?;
        config.sync.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("in config file {}", path.display()))
    }
}
