//! Mock daemon implementation for testing
//!
//! Provides an in-memory launcher and daemon that don't need tincd or root.
//! Used by the unit tests and, through the `mock-daemon` feature, by the
//! integration tests.

use crate::daemon::{Daemon, DaemonLauncher};
use crate::error::{DaemonError, TerminationError};
use crate::supervisor::Completion;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory launcher recording every start
#[derive(Default)]
pub struct MockLauncher {
    started: Mutex<Vec<PathBuf>>,
    daemons: Mutex<Vec<Arc<MockDaemon>>>,
    peers: Mutex<Vec<String>>,
    fail_start: AtomicBool,
    ignore_stop: AtomicBool,
}

impl MockLauncher {
    /// Create a launcher whose daemons start with no peers
    pub fn new() -> Self {
        Self::default()
    }

    /// Peers every new daemon reports
    pub fn with_peers(self, peers: &[&str]) -> Self {
        *self.peers.lock().unwrap() = peers.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Make subsequent starts fail
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent daemons ignore stop requests
    pub fn set_ignore_stop(&self, ignore: bool) {
        self.ignore_stop.store(ignore, Ordering::SeqCst);
    }

    /// Network directories passed to successful starts, in order
    pub fn started(&self) -> Vec<PathBuf> {
        self.started.lock().unwrap().clone()
    }

    /// Number of successful starts
    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// Most recently started daemon
    pub fn last(&self) -> Option<Arc<MockDaemon>> {
        self.daemons.lock().unwrap().last().cloned()
    }
}

impl DaemonLauncher for MockLauncher {
    fn start(&self, network_dir: &Path) -> Result<Arc<dyn Daemon>, DaemonError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(DaemonError::Start {
                reason: "mock start failure".to_string(),
            });
        }

        let daemon = Arc::new(MockDaemon {
            completion: Completion::new(),
            peers: Mutex::new(self.peers.lock().unwrap().clone()),
            stop_calls: AtomicUsize::new(0),
            ignore_stop: AtomicBool::new(self.ignore_stop.load(Ordering::SeqCst)),
        });

        self.started.lock().unwrap().push(network_dir.to_path_buf());
        self.daemons.lock().unwrap().push(daemon.clone());
        Ok(daemon)
    }
}

/// In-memory daemon controlled by the test
pub struct MockDaemon {
    completion: Completion,
    peers: Mutex<Vec<String>>,
    stop_calls: AtomicUsize,
    ignore_stop: AtomicBool,
}

impl MockDaemon {
    /// Replace the reported peers
    pub fn set_peers(&self, peers: &[&str]) {
        *self.peers.lock().unwrap() = peers.iter().map(|p| p.to_string()).collect();
    }

    /// Terminate as if the daemon crashed
    pub fn crash(&self, reason: &str) {
        self.completion.fire(Some(TerminationError::Daemon {
            reason: reason.to_string(),
        }));
    }

    /// Terminate cleanly without a stop request
    pub fn exit(&self) {
        self.completion.fire(None);
    }

    /// Number of stop requests received
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Whether the daemon has terminated
    pub fn is_done(&self) -> bool {
        self.completion.is_fired()
    }
}

#[async_trait]
impl Daemon for MockDaemon {
    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_stop.load(Ordering::SeqCst) {
            self.completion.fire(None);
        }
    }

    async fn wait(&self) {
        self.completion.wait().await
    }

    fn termination_error(&self) -> Option<TerminationError> {
        self.completion.termination_error()
    }

    fn peers(&self) -> Vec<String> {
        self.peers.lock().unwrap().clone()
    }
}
