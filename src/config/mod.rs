// Configuration management for termtunes
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub player: PlayerConfig,
    pub catalog: CatalogConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

/// How the external audio process is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub binary: String,
    pub user_agent: String,
    pub watch_url_base: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub binary: String,
    pub max_results: usize,
}

/// Timing policy of the playback session. All values in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub settle_delay_ms: u64,
    pub advance_delay_ms: u64,
    pub spawn_retry_delay_ms: u64,
    pub kill_grace_ms: u64,
    /// Abort a scheduled auto-advance when playback is stopped by hand
    pub cancel_pending_on_stop: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("termtunes");

        Self {
            player: PlayerConfig::default(),
            catalog: CatalogConfig {
                binary: "yt-dlp".to_string(),
                max_results: 10,
            },
            playback: PlaybackConfig::default(),
            logging: LoggingConfig {
                directory: data_dir.join("logs"),
            },
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: "mpv".to_string(),
            // The playback CDN refuses requests without a desktop browser identity
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            watch_url_base: "https://www.youtube.com/watch?v=".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            advance_delay_ms: 500,
            spawn_retry_delay_ms: 1000,
            kill_grace_ms: 2000,
            cancel_pending_on_stop: true,
        }
    }
}

impl PlaybackConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    pub fn spawn_retry_delay(&self) -> Duration {
        Duration::from_millis(self.spawn_retry_delay_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

impl Config {
    /// Load from the default location, writing defaults there on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", config_path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("termtunes");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.player.binary, "mpv");
        assert_eq!(config.playback.settle_delay(), Duration::from_millis(1000));
        assert_eq!(config.playback.kill_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_saved_config_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.catalog.max_results = 25;
        config.playback.cancel_pending_on_stop = false;
        config.player.extra_args = vec!["--volume=50".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.catalog.max_results, 25);
        assert!(!loaded.playback.cancel_pending_on_stop);
        assert_eq!(loaded.player.extra_args, vec!["--volume=50".to_string()]);
    }

    #[test]
    fn test_extra_args_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let content = r#"
[player]
binary = "/opt/mpv/bin/mpv"
user_agent = "Mozilla/5.0"
watch_url_base = "https://www.youtube.com/watch?v="

[catalog]
binary = "yt-dlp"
max_results = 5

[playback]
settle_delay_ms = 1000
advance_delay_ms = 500
spawn_retry_delay_ms = 1000
kill_grace_ms = 2000
cancel_pending_on_stop = true

[logging]
directory = "/tmp/termtunes-logs"
"#;
        fs::write(&path, content).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.player.binary, "/opt/mpv/bin/mpv");
        assert!(loaded.player.extra_args.is_empty());
    }

    #[test]
    fn test_broken_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "player = 42").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
