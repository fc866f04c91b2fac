// Configuration management for walkup
// Handles loading/saving settings, with sensible defaults when config is missing

use crate::session::SessionSettings;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub assignments_path: PathBuf,
    pub roster_path: PathBuf,
    pub playback: PlaybackConfig,
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub max_play_time_seconds: u64,
    pub provider_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub access_token: Option<String>,
    /// Playlist id, spotify:playlist: URI or open.spotify.com link
    pub playlist: Option<String>,
    pub device_id: Option<String>,
    pub api_base: String,
}

/// Songs to use when no playlist is configured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub songs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::base_dir();

        Self {
            assignments_path: data_dir.join("saved_assignments.json"),
            roster_path: data_dir.join("roster.txt"),
            playback: PlaybackConfig {
                max_play_time_seconds: 30,
                provider_timeout_seconds: 10,
            },
            spotify: SpotifyConfig {
                access_token: None,
                playlist: None,
                device_id: None,
                api_base: crate::provider::spotify::DEFAULT_API_BASE.to_string(),
            },
            catalog: CatalogConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), writing defaults on first run,
    /// then layer the SPOTIFY_* environment variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            debug!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            info!("Wrote default config to {}", config_path.display());
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

    /// Environment wins over the file - same variable names the old scripts used
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_blank("SPOTIFY_ACCESS_TOKEN") {
            self.spotify.access_token = Some(token);
        }
        if let Some(playlist) = non_blank("SPOTIFY_PLAYLIST_URI") {
            self.spotify.playlist = Some(playlist);
        }
        if let Some(device) = non_blank("SPOTIFY_DEVICE_ID") {
            self.spotify.device_id = Some(device);
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_play_time: Duration::from_secs(self.playback.max_play_time_seconds.max(1)),
            call_timeout: Duration::from_secs(self.playback.provider_timeout_seconds.max(1)),
        }
    }

    fn base_dir() -> PathBuf {
        config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("walkup")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("walkup");

        Ok(config_dir.join("config.toml"))
    }
}
