use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub workspace: WorkspaceConfig,
    pub sync: SyncConfig,
    pub limits: LimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the transcription provider API.
    pub api_endpoint: String,
    /// API key. The MEETSYNC_SOURCE_API_KEY env var overrides this.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Base URL of the destination workspace API.
    pub api_endpoint: String,
    /// API key. The MEETSYNC_WORKSPACE_API_KEY env var overrides this.
    pub api_key: Option<String>,
    /// Database that receives meeting pages.
    pub meetings_db: String,
    /// Database that receives task pages.
    pub tasks_db: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of candidate meetings fetched per run.
    pub max_meetings: usize,
    /// Every action item is assigned to this party, regardless of who the
    /// transcript names (the original assignee is kept in a note).
    pub default_owner: String,
    /// Maximum code points per transcript chunk sent to the workspace.
    pub chunk_size: usize,
    /// Hours between runs in scheduled mode.
    pub schedule_interval_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Outbound calls admitted per window.
    pub rate_limit_calls: usize,
    /// Window length in milliseconds.
    pub rate_limit_window_ms: u64,
    /// Total attempts per outbound call (first try included).
    pub retry_attempts: usize,
    /// First backoff delay in seconds.
    pub retry_base_delay_secs: u64,
    /// Backoff ceiling in seconds.
    pub retry_max_delay_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.transcription.example/v1".to_string(),
            api_key: None,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.workspace.example/v1".to_string(),
            api_key: None,
            meetings_db: String::new(),
            tasks_db: String::new(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_meetings: 5,
            default_owner: "Brian".to_string(),
            chunk_size: 2000,
            schedule_interval_hours: 3,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            rate_limit_calls: 3,
            rate_limit_window_ms: 1000,
            retry_attempts: 3,
            retry_base_delay_secs: 4,
            retry_max_delay_secs: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config.with_env_overrides());
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config.with_env_overrides())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Credentials from the environment take precedence over the file, so
    /// keys never have to live on disk.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("MEETSYNC_SOURCE_API_KEY") {
            if !key.is_empty() {
                self.source.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("MEETSYNC_WORKSPACE_API_KEY") {
            if !key.is_empty() {
                self.workspace.api_key = Some(key);
            }
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sync.max_meetings, 5);
        assert_eq!(config.sync.chunk_size, 2000);
        assert_eq!(config.limits.rate_limit_calls, 3);
        assert_eq!(config.limits.retry_attempts, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            max_meetings = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.max_meetings, 20);
        assert_eq!(config.sync.default_owner, "Brian");
        assert_eq!(config.limits.rate_limit_window_ms, 1000);
    }
}
