//! Worker spawners
//!
//! A spawner turns a network name into a live [`Port`]. The variant is
//! picked once, at composition time, from the process's privileges.

use crate::config::WorkerSettings;
use crate::daemon::DaemonLauncher;
use crate::elevation::ExecutionMode;
use crate::error::SpawnError;
use crate::supervisor::port::Port;
use crate::supervisor::same_process::SameProcessSpawner;
use crate::supervisor::sub_process::SubProcessSpawner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Produces workers for networks
pub trait Spawner: Send + Sync {
    /// Launch a worker for `network`
    ///
    /// Returns once the launch itself is done, without waiting for the daemon
    /// to become ready. Must be called from within a tokio runtime.
    fn spawn(&self, network: &str) -> Result<Port, SpawnError>;
}

/// Build the spawner matching `mode`
pub fn select_spawner(
    mode: ExecutionMode,
    config_dir: PathBuf,
    settings: &WorkerSettings,
    launcher: Arc<dyn DaemonLauncher>,
) -> Arc<dyn Spawner> {
    info!("Workers will run as {:?}", mode);
    match mode {
        ExecutionMode::SameProcess => Arc::new(SameProcessSpawner::new(config_dir, launcher)),
        ExecutionMode::SubProcess => Arc::new(SubProcessSpawner::new(config_dir, settings.clone())),
    }
}

/// Reject names that would escape the configuration directory
pub fn validate_network_name(network: &str) -> Result<(), SpawnError> {
    let valid = !network.is_empty()
        && network != "."
        && network != ".."
        && !network.contains(['/', '\\'])
        && !network.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(SpawnError::InvalidName {
            name: network.to_string(),
        })
    }
}
