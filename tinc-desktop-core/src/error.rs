//! Error types for tinc-desktop
//!
//! This module defines all error types used throughout the supervisor,
//! from spawn failures to control-plane transport problems.

use thiserror::Error;

/// Main error type for the tinc-desktop application
#[derive(Error, Debug)]
pub enum DesktopError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while launching a worker
    #[error("Spawn error: {0}")]
    Spawn(#[from] SpawnError),

    /// Errors raised by control calls against a live worker
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Errors raised by the daemon layer
    #[error("Daemon error: {0}")]
    Daemon(#[from] DaemonError),

    /// Abnormal worker termination
    #[error("Worker terminated: {0}")]
    Terminated(#[from] TerminationError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Failures while producing a worker handle
///
/// None of these leave anything behind in the registry.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("Invalid network name: {name:?}")]
    InvalidName { name: String },

    #[error("Cannot resolve own executable: {reason}")]
    ExecutableNotFound { reason: String },

    #[error("Failed to launch worker process: {reason}")]
    LaunchFailed { reason: String },

    #[error("Failed to start daemon for network {network}: {source}")]
    DaemonStart {
        network: String,
        #[source]
        source: DaemonError,
    },

    #[error("No free loopback port after {attempts} attempts")]
    NoFreePort { attempts: u32 },
}

/// Control-plane call failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker could not be reached or returned garbage
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// The worker answered with an error
    #[error("Worker reported error: {message}")]
    Remote { message: String },

    /// The caller's deadline elapsed; the worker may still stop later
    #[error("Timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// The worker has already terminated
    #[error("Worker is gone")]
    Gone,
}

impl WorkerError {
    /// Whether the error came from failing to talk to the worker at all
    pub fn is_transport(&self) -> bool {
        matches!(self, WorkerError::Transport { .. })
    }
}

/// Captured cause of a worker's abnormal exit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminationError {
    #[error("exited with status {code}")]
    ExitStatus { code: i32 },

    #[error("killed by signal")]
    Signalled,

    #[error("failed to wait for worker: {reason}")]
    Wait { reason: String },

    #[error("daemon failed: {reason}")]
    Daemon { reason: String },
}

impl TerminationError {
    /// Classify a process exit; `None` for a successful one
    pub fn from_exit_status(status: std::process::ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        Some(match status.code() {
            Some(code) => TerminationError::ExitStatus { code },
            None => TerminationError::Signalled,
        })
    }
}

/// Errors from the daemon layer
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Failed to start daemon: {reason}")]
    Start { reason: String },

    #[error("Network directory not found: {path}")]
    MissingNetwork { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DesktopError>;
