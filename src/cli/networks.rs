//! Network listing command

use std::path::Path;
use tinc_desktop_core::config::list_networks;
use tinc_desktop_core::error::DesktopError;
use tracing::debug;

/// Print the networks defined in `config_dir`, one per line
pub fn run_list(config_dir: &Path) -> Result<(), DesktopError> {
    let networks = list_networks(config_dir)?;
    debug!("Found {} network(s) in {:?}", networks.len(), config_dir);

    if networks.is_empty() {
        eprintln!("No networks found in {}", config_dir.display());
        return Ok(());
    }
    for network in networks {
        println!("{}", network);
    }
    Ok(())
}
