//! Configuration for rednote.
//!
//! Configuration is read from `~/.config/rednote/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub timeouts: TimeoutConfig,
    pub archive: ArchiveConfig,
}

/// Everything needed to launch one browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Chrome/Chromium executable; autodetected when unset
    pub binary_path: Option<PathBuf>,

    /// JSON file carrying the login cookies between sessions
    pub cookies_path: Option<PathBuf>,

    /// Display name reported by the login status check
    pub username: Option<String>,

    /// User agent string to use
    pub user_agent: Option<String>,

    pub window_width: u32,
    pub window_height: u32,

    /// Timeouts applied to pages opened in this session
    #[serde(skip)]
    pub timeouts: TimeoutConfig,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            binary_path: None,
            cookies_path: None,
            username: None,
            user_agent: None,
            window_width: 1440,
            window_height: 900,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl BrowserSettings {
    /// Configured cookie file, or `<data dir>/rednote/cookies.json`.
    pub fn resolved_cookies_path(&self) -> Option<PathBuf> {
        self.cookies_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("rednote").join("cookies.json")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for list/search/publish setup in seconds (default: 60)
    pub page_secs: u64,

    /// Deadline for the image upload step in seconds (default: 30)
    pub upload_secs: u64,

    /// Bound on fallback element resolution in seconds (default: 10)
    pub resolve_secs: u64,

    /// Polling interval for predicate waits in milliseconds (default: 200)
    pub poll_interval_ms: u64,

    /// Quiet window for the DOM stability wait in milliseconds (default: 500)
    pub stable_quiet_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_secs: 60,
            upload_secs: 30,
            resolve_secs: 10,
            poll_interval_ms: 200,
            stable_quiet_ms: 500,
        }
    }
}

impl TimeoutConfig {
    pub fn page(&self) -> Duration {
        Duration::from_secs(self.page_secs)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_secs)
    }

    pub fn resolve(&self) -> Duration {
        Duration::from_secs(self.resolve_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stable_quiet(&self) -> Duration {
        Duration::from_millis(self.stable_quiet_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Where archived notes are written (default: ./content)
    pub output_dir: Option<PathBuf>,

    /// How many home-feed notes to archive (default: 10)
    pub limit: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            limit: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default().finish());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        Ok(config.finish())
    }

    /// Get the default config file path: `~/.config/rednote/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("rednote").join("config.toml"))
    }

    /// Browser settings carry the timeout table so sessions see one value.
    fn finish(mut self) -> Self {
        self.browser.timeouts = self.timeouts.clone();
        self
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# rednote configuration

[browser]
# Run browser in headless mode (no visible window).
# Log in once with `rednote --headed login` so the session cookie is stored.
headless = true

# Path to the Chrome/Chromium binary (autodetected when unset)
# binary_path = "/usr/bin/chromium"

# Login cookies shared by every session (default: <data dir>/rednote/cookies.json)
# cookies_path = "/home/me/.local/share/rednote/cookies.json"

# Display name reported by `rednote status`
# username = ""

window_width = 1440
window_height = 900

[timeouts]
# Deadline for feed listing, search and publish setup (seconds)
page_secs = 60

# Deadline for the image upload step (seconds)
upload_secs = 30

# Bound on locating editor elements that have several markups (seconds)
resolve_secs = 10

# How often wait predicates are re-evaluated (milliseconds)
poll_interval_ms = 200

# DOM must stay unchanged this long to count as stable (milliseconds)
stable_quiet_ms = 500

[archive]
# Output directory for `rednote archive` (default: ./content)
# output_dir = "content"

# Number of home-feed notes to archive
limit = 10
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
