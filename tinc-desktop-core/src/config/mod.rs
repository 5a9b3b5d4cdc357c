//! Configuration module
//!
//! Resolves the configuration directory holding per-network tinc state and
//! loads the optional `desktop.toml` settings file.

use serde::{Deserialize, Serialize};

pub mod toml_config;

pub use toml_config::{get_config_dir, list_networks, load_config_from_dir, DesktopConfig};

/// Sub-process worker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// First port of the range workers are bound in
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,

    /// Number of ports in the range
    #[serde(default = "default_port_range_len")]
    pub port_range_len: u16,

    /// Bind probes before giving up on finding a free port
    #[serde(default = "default_port_attempts")]
    pub port_attempts: u32,

    /// Deadline for controller-driven stops, in seconds
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

fn default_port_range_start() -> u16 {
    32000
}
fn default_port_range_len() -> u16 {
    32000
}
fn default_port_attempts() -> u32 {
    8
}
fn default_stop_timeout() -> u64 {
    15
}

impl WorkerSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.port_range_start < 1024 {
            return Err(format!(
                "port_range_start must be >= 1024, got: {}",
                self.port_range_start
            ));
        }

        if self.port_range_len == 0 {
            return Err("port_range_len cannot be zero".to_string());
        }

        let last = u32::from(self.port_range_start) + u32::from(self.port_range_len) - 1;
        if last > u32::from(u16::MAX) {
            return Err(format!(
                "port range {}+{} exceeds 65535",
                self.port_range_start, self.port_range_len
            ));
        }

        if self.port_attempts < 1 || self.port_attempts > 64 {
            return Err(format!(
                "port_attempts must be between 1 and 64, got: {}",
                self.port_attempts
            ));
        }

        if self.stop_timeout_secs == 0 {
            return Err("stop_timeout_secs cannot be zero".to_string());
        }

        Ok(())
    }

    /// Deadline for controller-driven stops
    pub fn stop_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            port_range_start: default_port_range_start(),
            port_range_len: default_port_range_len(),
            port_attempts: default_port_attempts(),
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}
