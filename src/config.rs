//! Application paths and persisted settings.
//!
//! Path resolution priority: CLI `--config-dir` -> `VIGIL_CONFIG_DIR`
//! env var -> local folder if it already holds vigil files -> platform
//! config/data dirs from dirs-next.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::sync::DEFAULT_SLOP_SECS;
use crate::entities::DEFAULT_ONLINE_WINDOW_MINS;

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("VIGIL_CONFIG_DIR").ok().map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Get path to a configuration file
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (logs, caches)
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;
    }
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;
    }

    Ok(())
}

/// Check if any vigil files already live in the given directory
fn has_local_config_files(dir: &Path) -> bool {
    ["vigil.json", "vigil.log"]
        .iter()
        .any(|name| dir.join(name).exists())
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(cwd) = std::env::current_dir() {
        if has_local_config_files(&cwd) {
            return cwd;
        }
    }
    dirs_next::config_dir()
        .map(|d| d.join("vigil"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(cwd) = std::env::current_dir() {
        if has_local_config_files(&cwd) {
            return cwd;
        }
    }
    dirs_next::data_dir()
        .map(|d| d.join("vigil"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Persisted review settings (vigil.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Drift/live-edge tolerance in seconds.
    pub slop_secs: f64,
    /// Real-time interval of the review tick.
    pub tick_ms: u64,
    /// DVR retention assumed for live buffers, hours back from now.
    /// Zero means unbounded.
    pub retention_hours: i64,
    /// Ping recency for a camera to count as online, minutes.
    pub online_window_mins: i64,
    /// Slot count the grid starts with (1, 4, 9 or 16).
    pub default_grid_size: usize,
    /// Background fetch threads (0 = derive from CPU count).
    pub fetch_threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slop_secs: DEFAULT_SLOP_SECS,
            tick_ms: 1000,
            retention_hours: 24,
            online_window_mins: DEFAULT_ONLINE_WINDOW_MINS,
            default_grid_size: 9,
            fetch_threads: 2,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Retention as a `TimeDelta`, `None` when unbounded.
    pub fn retention(&self) -> Option<chrono::TimeDelta> {
        if self.retention_hours > 0 {
            Some(chrono::TimeDelta::hours(self.retention_hours))
        } else {
            None
        }
    }

    /// Online window as a `TimeDelta`.
    pub fn online_window(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::minutes(self.online_window_mins)
    }

    /// Fetch pool size, derived from the CPU count when unset.
    pub fn fetch_thread_count(&self) -> usize {
        if self.fetch_threads > 0 {
            self.fetch_threads
        } else {
            (num_cpus::get() / 4).max(1)
        }
    }
}
