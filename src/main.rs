//! tinc-desktop - privilege-separated tinc VPN controller
//!
//! Starts and stops tinc networks from an unprivileged session. Each network
//! runs in a worker: in-process when already root, otherwise an elevated copy
//! of this executable commanded over a loopback control channel.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tinc_desktop_core::config::get_config_dir;
use tinc_desktop_core::error::DesktopError;
use tinc_desktop_core::init_logging;
use tinc_desktop_core::supervisor::validate_network_name;

mod cli;

/// Controller log file inside the configuration directory
const CONTROLLER_LOG: &str = "log.txt";

#[derive(Parser)]
#[command(name = "tinc-desktop")]
#[command(about = "Run tinc VPN networks from an unprivileged desktop session")]
struct Cli {
    /// Directory holding one sub-directory per network
    #[arg(short, long, env = "TINC_DESKTOP_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,

    /// Worker mode: loopback port to serve the control channel on
    #[arg(short, long, env = "TINC_DESKTOP_PORT", requires = "network", hide = true)]
    port: Option<u16>,

    /// Worker mode: network to run
    #[arg(short, long, env = "TINC_DESKTOP_NETWORK", requires = "port", hide = true)]
    network: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured networks
    Networks,
    /// Start networks and keep them up until Ctrl+C
    Run {
        /// Networks to start
        #[arg(required = true)]
        networks: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_dir = match get_config_dir(cli.config_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let worker = cli.port.zip(cli.network);
    let log_file = match &worker {
        Some((_, network)) => {
            // The name becomes part of a path written with elevated rights
            if let Err(e) = validate_network_name(network) {
                eprintln!("{}", e);
                std::process::exit(2);
            }
            config_dir.join(format!("{}.log", network))
        }
        None => config_dir.join(CONTROLLER_LOG),
    };

    if let Err(e) = init_logging(Some(&log_file)) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = match (worker, cli.command) {
        (Some((port, network)), _) => {
            cli::worker::run_worker_mode(&config_dir, port, &network).await
        }
        (None, Some(Commands::Run { networks })) => {
            cli::run::run_networks(&config_dir, &networks).await
        }
        (None, Some(Commands::Networks)) | (None, None) => cli::networks::run_list(&config_dir),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                DesktopError::Config(_) | DesktopError::Toml(_) => 2,
                // Everything else happened at runtime (exit code 1)
                DesktopError::Spawn(_)
                | DesktopError::Worker(_)
                | DesktopError::Daemon(_)
                | DesktopError::Terminated(_)
                | DesktopError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
