//! Network run command
//!
//! Starts the requested networks, reports their peers and lifecycle events,
//! and stops every worker on Ctrl+C or once all of them have terminated.

use std::path::Path;
use std::sync::Arc;
use tinc_desktop_core::config::load_config_from_dir;
use tinc_desktop_core::daemon::{DaemonLauncher, TincdLauncher};
use tinc_desktop_core::elevation::ExecutionMode;
use tinc_desktop_core::error::DesktopError;
use tinc_desktop_core::supervisor::{retry_transport, select_spawner, Manager};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Run the given networks until interrupted
pub async fn run_networks(config_dir: &Path, networks: &[String]) -> Result<(), DesktopError> {
    let config = load_config_from_dir(config_dir)?;

    let launcher: Arc<dyn DaemonLauncher> = Arc::new(TincdLauncher::default());
    let spawner = select_spawner(
        ExecutionMode::detect(),
        config_dir.to_path_buf(),
        &config.worker,
        launcher,
    );
    let manager = Manager::new(spawner);
    let mut events = manager.subscribe();
    let stop_timeout = config.worker.stop_timeout();

    for network in networks {
        let port = match manager.ensure_running(network) {
            Ok(port) => port,
            Err(e) => {
                error!("Failed to start {}: {}", network, e);
                manager.stop_all(stop_timeout).await;
                return Err(e.into());
            }
        };
        println!("✓ Started {}", network);

        // The worker may still be binding its control port
        match retry_transport(&config.startup_retry, || port.peers()).await {
            Ok(peers) if peers.is_empty() => println!("  {}: no peers connected yet", network),
            Ok(peers) => println!("  {}: connected to {}", network, peers.join(", ")),
            Err(e) => warn!("Could not query peers of {}: {}", network, e),
        }
    }

    println!("Press Ctrl+C to stop");
    loop {
        if manager.names().is_empty() {
            info!("All workers terminated");
            break;
        }

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Interrupted, stopping workers");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", event),
                Err(RecvError::Lagged(missed)) => debug!("Missed {} lifecycle events", missed),
                Err(RecvError::Closed) => break,
            },
        }
    }

    manager.stop_all(stop_timeout).await;
    println!("Stopped");
    Ok(())
}
