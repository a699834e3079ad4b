use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::remote::cloud::DEFAULT_MAX_SLUG_ATTEMPTS;
use crate::core::trip::templates::default_palette;
use crate::core::trip::Palette;

pub const CLOUD_URL_ENV: &str = "TRIPKIT_CLOUD_URL";
pub const CLOUD_KEY_ENV: &str = "TRIPKIT_CLOUD_KEY";

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub share: ShareConfig,
    pub cloud: CloudConfig,
    pub mirror: MirrorConfig,
    /// Theme classes applied to documents that carry no palette.
    pub palette: Palette,
}

/// Device-local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
    Sqlite,
}

/// Link building and shorthand itinerary names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Page address links are built against.
    pub app_url: String,
    /// Prefix for `#name` shorthand, absolute or relative to the page.
    pub itineraries_base: String,
}

/// Hosted trip table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub table: String,
    pub max_slug_attempts: usize,
}

/// Draft mirroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Key the draft is stored under.
    pub storage_key: String,
    /// Quiet period before a burst of edits is written.
    pub debounce_ms: u64,
    /// Largest draft the store accepts, in bytes.
    pub quota_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            share: ShareConfig::default(),
            cloud: CloudConfig::default(),
            mirror: MirrorConfig::default(),
            palette: default_palette(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend: StoreBackend::File,
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8080/".to_string(),
            itineraries_base: "itineraries".to_string(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            table: "trips".to_string(),
            max_slug_attempts: DEFAULT_MAX_SLUG_ATTEMPTS,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            storage_key: "tripkit.draft".to_string(),
            debounce_ms: 1000,
            quota_bytes: 5 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/tripkit/config.toml`, then apply
    /// environment overrides. Falls back to defaults if the file is missing
    /// or unparseable.
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::config_path());
        config.apply_env();
        config
    }

    /// Load from an explicit path without environment overrides.
    pub fn load_from(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(CLOUD_URL_ENV) {
            self.cloud.base_url = Some(url);
        }
        if let Ok(key) = std::env::var(CLOUD_KEY_ENV) {
            self.cloud.api_key = Some(key);
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("tripkit"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("tripkit").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
