//! Worker mode
//!
//! Entry point of the elevated copy of this executable: serves the control
//! channel for a single network until its daemon terminates.

use std::path::Path;
use std::sync::Arc;
use tinc_desktop_core::daemon::TincdLauncher;
use tinc_desktop_core::error::DesktopError;
use tinc_desktop_core::rpc::run_worker;
use tracing::info;

pub async fn run_worker_mode(
    config_dir: &Path,
    port: u16,
    network: &str,
) -> Result<(), DesktopError> {
    info!(
        "Worker mode for {} (PID {}, port {})",
        network,
        std::process::id(),
        port
    );
    run_worker(config_dir, port, network, Arc::new(TincdLauncher::default())).await
}
