//! In-process spawner
//!
//! Used when the controller already holds the privileges tincd needs: the
//! daemon is started directly and controlled through plain method calls.

use crate::daemon::{Daemon, DaemonLauncher};
use crate::error::{SpawnError, WorkerError};
use crate::supervisor::completion::Completion;
use crate::supervisor::port::{Port, Worker};
use crate::supervisor::spawner::{validate_network_name, Spawner};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Starts daemons inside the current process
pub struct SameProcessSpawner {
    config_dir: PathBuf,
    launcher: Arc<dyn DaemonLauncher>,
}

impl SameProcessSpawner {
    pub fn new(config_dir: PathBuf, launcher: Arc<dyn DaemonLauncher>) -> Self {
        Self {
            config_dir,
            launcher,
        }
    }
}

impl Spawner for SameProcessSpawner {
    #[tracing::instrument(skip(self))]
    fn spawn(&self, network: &str) -> Result<Port, SpawnError> {
        validate_network_name(network)?;

        let daemon = self
            .launcher
            .start(&self.config_dir.join(network))
            .map_err(|source| SpawnError::DaemonStart {
                network: network.to_string(),
                source,
            })?;
        info!("Started in-process daemon for {}", network);

        let completion = Completion::new();
        {
            let daemon = Arc::clone(&daemon);
            let completion = completion.clone();
            tokio::spawn(async move {
                daemon.wait().await;
                completion.fire(daemon.termination_error());
            });
        }

        Ok(Port::new(network, Arc::new(LocalWorker { daemon }), completion))
    }
}

/// Control client calling the daemon directly
struct LocalWorker {
    daemon: Arc<dyn Daemon>,
}

#[async_trait]
impl Worker for LocalWorker {
    async fn stop(&self) -> Result<bool, WorkerError> {
        self.daemon.stop();
        self.daemon.wait().await;
        Ok(true)
    }

    async fn peers(&self) -> Result<Vec<String>, WorkerError> {
        Ok(self.daemon.peers())
    }
}
