use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, loaded from `fabric-mcp.toml` when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabricMcpConfig {
    #[serde(default)]
    pub engines: EnginesConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnginesConfig {
    #[serde(default)]
    pub fabric: EngineOverride,

    #[serde(default)]
    pub ytdlp: EngineOverride,
}

/// Explicit location for an external executable. Bypasses probing when `path` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineOverride {
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Arguments placed before every invocation's own arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Version probes run by the health check.
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,

    /// Pattern listing and transcript fetches.
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,

    /// Full pattern execution, which may wait on a remote model.
    #[serde(default = "default_pattern_secs")]
    pub pattern_secs: u64,
}

fn default_probe_secs() -> u64 {
    5
}

fn default_command_secs() -> u64 {
    30
}

fn default_pattern_secs() -> u64 {
    300
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: default_probe_secs(),
            command_secs: default_command_secs(),
            pattern_secs: default_pattern_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn pattern(&self) -> Duration {
        Duration::from_secs(self.pattern_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_redirects() -> usize {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("fabric-mcp/{} (+content fetcher)", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl FabricMcpConfig {
    /// Load the config file if it exists, otherwise fall back to defaults.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .context("Failed to read configuration file")?;
        let config = toml::from_str(&content).context("Failed to parse configuration file")?;

        tracing::info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Apply explicit executable paths (from CLI flags or environment) on top of the file.
    pub fn with_engine_paths(mut self, fabric: Option<PathBuf>, ytdlp: Option<PathBuf>) -> Self {
        if fabric.is_some() {
            self.engines.fabric.path = fabric;
        }
        if ytdlp.is_some() {
            self.engines.ytdlp.path = ytdlp;
        }
        self
    }
}
