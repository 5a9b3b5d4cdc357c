//! Elevated sub-process spawner
//!
//! Re-runs this executable in worker mode through the platform's elevation
//! tool. Once elevated, the child can no longer be signalled or read from,
//! so it is commanded over a loopback JSON-RPC port and only its exit is
//! observed directly.

use crate::config::WorkerSettings;
use crate::elevation::Elevation;
use crate::error::{SpawnError, TerminationError};
use crate::rpc::RpcClient;
use crate::supervisor::completion::Completion;
use crate::supervisor::port::Port;
use crate::supervisor::spawner::{validate_network_name, Spawner};
use rand::Rng;
use std::net::{Ipv4Addr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Launches one elevated worker process per network
pub struct SubProcessSpawner {
    config_dir: PathBuf,
    settings: WorkerSettings,
    elevation: Elevation,
    executable: Option<PathBuf>,
}

impl SubProcessSpawner {
    /// Spawner re-running the current executable with the platform elevation
    pub fn new(config_dir: PathBuf, settings: WorkerSettings) -> Self {
        Self {
            config_dir,
            settings,
            elevation: Elevation::detect(),
            executable: None,
        }
    }

    /// Override the elevation strategy
    pub fn with_elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }

    /// Run `executable` instead of the current executable
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Pick a random port in the configured range that is free right now
    ///
    /// The port is released again before the worker binds it, so another
    /// process may still grab it in between.
    fn choose_port(&self) -> Result<u16, SpawnError> {
        let mut rng = rand::rng();
        let start = u32::from(self.settings.port_range_start);
        let len = u32::from(self.settings.port_range_len);

        for attempt in 1..=self.settings.port_attempts {
            let candidate = start + rng.random_range(0..len);
            let Ok(port) = u16::try_from(candidate) else {
                continue;
            };
            match TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
                Ok(_) => return Ok(port),
                Err(e) => debug!("Port {} busy on attempt {}: {}", port, attempt, e),
            }
        }

        Err(SpawnError::NoFreePort {
            attempts: self.settings.port_attempts,
        })
    }

    fn executable(&self) -> Result<PathBuf, SpawnError> {
        match &self.executable {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe().map_err(|e| SpawnError::ExecutableNotFound {
                reason: e.to_string(),
            }),
        }
    }
}

/// Command line re-invoking `executable` in worker mode
pub fn worker_command(
    executable: &Path,
    config_dir: &Path,
    port: u16,
    network: &str,
) -> Vec<String> {
    vec![
        executable.to_string_lossy().to_string(),
        "--config-dir".to_string(),
        config_dir.to_string_lossy().to_string(),
        "--port".to_string(),
        port.to_string(),
        "--network".to_string(),
        network.to_string(),
    ]
}

impl Spawner for SubProcessSpawner {
    #[tracing::instrument(skip(self))]
    fn spawn(&self, network: &str) -> Result<Port, SpawnError> {
        validate_network_name(network)?;

        let executable = self.executable()?;
        let port = self.choose_port()?;
        let client = RpcClient::for_port(port).map_err(|e| SpawnError::LaunchFailed {
            reason: e.to_string(),
        })?;

        let args = worker_command(&executable, &self.config_dir, port, network);
        let command_line = self.elevation.wrap(&args);
        let (program, rest) = command_line
            .split_first()
            .ok_or_else(|| SpawnError::LaunchFailed {
                reason: "empty command line".to_string(),
            })?;

        debug!("Launching worker: {:?}", command_line);
        let mut child = Command::new(program)
            .args(rest)
            .spawn()
            .map_err(|e| SpawnError::LaunchFailed {
                reason: format!("{}: {}", program, e),
            })?;
        info!(
            "Launched worker for {} on port {} (PID {:?})",
            network,
            port,
            child.id()
        );

        let completion = Completion::new();
        {
            let completion = completion.clone();
            let network = network.to_string();
            tokio::spawn(async move {
                let outcome = match child.wait().await {
                    Ok(status) => TerminationError::from_exit_status(status),
                    Err(e) => Some(TerminationError::Wait {
                        reason: e.to_string(),
                    }),
                };
                if let Some(e) = &outcome {
                    warn!("Worker process for {} exited: {}", network, e);
                }
                completion.fire(outcome);
            });
        }

        Ok(Port::new(network, Arc::new(client), completion))
    }
}
