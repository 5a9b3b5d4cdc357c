//! Daemon layer
//!
//! The supervisor only needs a handful of operations from a VPN daemon:
//! start it for a network directory, stop it, wait for it and list its
//! peers. [`TincdLauncher`] provides them by running the `tincd` binary.

use crate::error::{DaemonError, TerminationError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub mod output_parser;
pub mod tincd;

#[cfg(any(test, feature = "mock-daemon"))]
pub mod mock;

pub use output_parser::{OutputParser, PeerEvent};
pub use tincd::TincdLauncher;

/// A running daemon instance
#[async_trait]
pub trait Daemon: Send + Sync {
    /// Request shutdown; idempotent and non-blocking
    fn stop(&self);

    /// Resolve once the daemon has terminated for any reason
    async fn wait(&self);

    /// Why the daemon terminated, `None` on a clean exit or while running
    fn termination_error(&self) -> Option<TerminationError>;

    /// Names of currently connected peers, sorted
    fn peers(&self) -> Vec<String>;
}

/// Starts daemons for network directories
pub trait DaemonLauncher: Send + Sync {
    /// Start a daemon for the network defined in `network_dir`
    ///
    /// Must be called from within a tokio runtime.
    fn start(&self, network_dir: &Path) -> Result<Arc<dyn Daemon>, DaemonError>;
}
