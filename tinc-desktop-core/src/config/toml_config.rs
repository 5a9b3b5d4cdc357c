//! TOML configuration file I/O
//!
//! Handles locating the configuration directory and loading the optional
//! `desktop.toml` settings file stored inside it.

use crate::config::WorkerSettings;
use crate::error::{ConfigError, DesktopError};
use crate::supervisor::retry::StartupRetry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings file name inside the configuration directory
const CONFIG_FILE_NAME: &str = "desktop.toml";

/// Directory name appended to the user's configuration root
const APP_DIR_NAME: &str = "tinc-desktop";

/// File whose presence marks a directory as a tinc network definition
const NETWORK_MARKER: &str = "tinc.conf";

/// Complete TOML configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesktopConfig {
    /// Sub-process worker settings
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Retry policy for the first control call after a spawn
    #[serde(default)]
    pub startup_retry: StartupRetry,
}

impl DesktopConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, DesktopError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DesktopError::Config(ConfigError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            }),
            _ => DesktopError::Config(ConfigError::IoError {
                message: format!("Failed to read config file: {}", e),
            }),
        })?;

        let config: DesktopConfig = toml::from_str(&contents).map_err(|e| {
            DesktopError::Config(ConfigError::ValidationError {
                message: format!("Failed to parse config file: {}", e),
            })
        })?;

        config.validate()?;

        debug!(
            "Loaded settings: ports {}+{}, {} bind attempts, startup retry {}x from {}ms",
            config.worker.port_range_start,
            config.worker.port_range_len,
            config.worker.port_attempts,
            config.startup_retry.max_attempts,
            config.startup_retry.base_interval_ms
        );

        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), DesktopError> {
        self.worker
            .validate()
            .map_err(|message| DesktopError::Config(ConfigError::ValidationError { message }))?;

        self.startup_retry.validate().map_err(|e| {
            DesktopError::Config(ConfigError::ValidationError {
                message: format!("Invalid startup retry policy: {}", e),
            })
        })?;

        Ok(())
    }
}

/// Load settings from `desktop.toml` inside `config_dir`
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config_from_dir(config_dir: &Path) -> Result<DesktopConfig, DesktopError> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!("No {} in {:?}, using defaults", CONFIG_FILE_NAME, config_dir);
        return Ok(DesktopConfig::default());
    }
    let config = DesktopConfig::from_file(&path)?;
    info!("Loaded settings from {:?}", path);
    Ok(config)
}

/// Resolve and create the configuration directory
///
/// Precedence: explicit override (the `--config-dir` flag), then
/// `TINC_DESKTOP_CONFIG_DIR`, then the user's configuration root.
pub fn get_config_dir(explicit: Option<&Path>) -> Result<PathBuf, DesktopError> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => match std::env::var("TINC_DESKTOP_CONFIG_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => user_config_root()?.join(APP_DIR_NAME),
        },
    };

    std::fs::create_dir_all(&dir).map_err(|e| {
        DesktopError::Config(ConfigError::IoError {
            message: format!("Failed to create config directory {:?}: {}", dir, e),
        })
    })?;

    Ok(dir)
}

#[cfg(windows)]
fn user_config_root() -> Result<PathBuf, DesktopError> {
    std::env::var("APPDATA").map(PathBuf::from).map_err(|_| {
        DesktopError::Config(ConfigError::IoError {
            message: "APPDATA environment variable not set".to_string(),
        })
    })
}

#[cfg(not(windows))]
fn user_config_root() -> Result<PathBuf, DesktopError> {
    // Under sudo, keep using the invoking user's directory so the elevated
    // worker and the desktop session agree on where networks live.
    if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        let home = std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{}", sudo_user));
        return Ok(PathBuf::from(home).join(".config"));
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        DesktopError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;
    Ok(PathBuf::from(home).join(".config"))
}

/// List network names defined under `config_dir`
///
/// A network is any sub-directory holding a `tinc.conf`. Names are sorted.
pub fn list_networks(config_dir: &Path) -> Result<Vec<String>, DesktopError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(config_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || !path.join(NETWORK_MARKER).is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = load_config_from_dir(temp_dir.path()).unwrap();
        assert_eq!(config, DesktopConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[worker]\nport_range_start = 40000\nport_range_len = 100\n",
        )
        .unwrap();

        let config = load_config_from_dir(temp_dir.path()).unwrap();
        assert_eq!(config.worker.port_range_start, 40000);
        assert_eq!(config.worker.port_range_len, 100);
        assert_eq!(config.worker.port_attempts, 8);
        assert_eq!(config.startup_retry, StartupRetry::default());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[startup_retry]\nmax_attempts = 0\n",
        )
        .unwrap();

        let result = load_config_from_dir(temp_dir.path());
        assert!(matches!(
            result,
            Err(DesktopError::Config(ConfigError::ValidationError { .. }))
        ));
    }

    #[test]
    fn test_explicit_config_dir_is_created() {
        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("nested").join("conf");
        let dir = get_config_dir(Some(&target)).unwrap();
        assert_eq!(dir, target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_list_networks_requires_tinc_conf() {
        let temp_dir = tempdir().unwrap();
        for name in ["office", "home"] {
            let dir = temp_dir.path().join(name);
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join(NETWORK_MARKER), "Name = laptop\n").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("scratch")).unwrap();
        std::fs::write(temp_dir.path().join("log.txt"), "").unwrap();

        let names = list_networks(temp_dir.path()).unwrap();
        assert_eq!(names, vec!["home".to_string(), "office".to_string()]);
    }
}
