//! tincd process adapter
//!
//! Runs `tincd` in the foreground as a child process, follows its log output
//! to keep the live peer set, and terminates it on request.

use crate::daemon::{Daemon, DaemonLauncher, OutputParser, PeerEvent};
use crate::error::{DaemonError, TerminationError};
use crate::supervisor::Completion;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Starts `tincd` for a network directory
#[derive(Debug, Clone)]
pub struct TincdLauncher {
    /// Program to run, looked up on PATH when relative
    binary: PathBuf,
    /// tincd debug level; 3 or more logs connection changes
    debug_level: u8,
}

impl TincdLauncher {
    /// Launcher for a specific tincd binary
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            debug_level: 3,
        }
    }

    /// Override the debug level passed to tincd
    pub fn with_debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }

    /// Command line arguments for a network directory
    fn arguments(&self, network_dir: &Path) -> Vec<String> {
        vec![
            "-D".to_string(),
            format!("--debug={}", self.debug_level),
            format!("--config={}", network_dir.display()),
            format!("--pidfile={}", network_dir.join("pid.run").display()),
        ]
    }
}

impl Default for TincdLauncher {
    fn default() -> Self {
        Self::new("tincd")
    }
}

impl DaemonLauncher for TincdLauncher {
    #[tracing::instrument(skip(self), fields(binary = %self.binary.display()))]
    fn start(&self, network_dir: &Path) -> Result<Arc<dyn Daemon>, DaemonError> {
        if !network_dir.is_dir() {
            return Err(DaemonError::MissingNetwork {
                path: network_dir.to_string_lossy().to_string(),
            });
        }

        let mut child = Command::new(&self.binary)
            .args(self.arguments(network_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DaemonError::Start {
                reason: format!("Failed to spawn {}: {}", self.binary.display(), e),
            })?;

        info!("tincd started with PID {:?}", child.id());

        let daemon = Arc::new(TincdDaemon {
            peers: Arc::new(Mutex::new(BTreeSet::new())),
            stop: CancellationToken::new(),
            completion: Completion::new(),
        });

        let parser = Arc::new(OutputParser::new());
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(follow_output(stdout, parser.clone(), daemon.peers.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(follow_output(stderr, parser, daemon.peers.clone()));
        }

        tokio::spawn(supervise(
            child,
            daemon.stop.clone(),
            daemon.completion.clone(),
            daemon.peers.clone(),
        ));

        Ok(daemon)
    }
}

type PeerSet = Arc<Mutex<BTreeSet<String>>>;

/// A running tincd child process
struct TincdDaemon {
    peers: PeerSet,
    stop: CancellationToken,
    completion: Completion,
}

#[async_trait]
impl Daemon for TincdDaemon {
    fn stop(&self) {
        if !self.stop.is_cancelled() {
            info!("Stopping tincd");
        }
        self.stop.cancel();
    }

    async fn wait(&self) {
        self.completion.wait().await
    }

    fn termination_error(&self) -> Option<TerminationError> {
        self.completion.termination_error()
    }

    fn peers(&self) -> Vec<String> {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Read log lines and apply peer changes until the stream closes
async fn follow_output<R>(stream: R, parser: Arc<OutputParser>, peers: PeerSet)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("tincd: {}", line);
        match parser.parse_line(&line) {
            PeerEvent::Activated { name, address } => {
                info!("Peer {} connected from {}", name, address);
                peers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name);
            }
            PeerEvent::Closed { name, .. } => {
                info!("Peer {} disconnected", name);
                peers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&name);
            }
            PeerEvent::Ready => info!("tincd ready"),
            PeerEvent::Other => {}
        }
    }
}

/// Wait for the child, terminating it when stop is requested
async fn supervise(
    mut child: Child,
    stop: CancellationToken,
    completion: Completion,
    peers: PeerSet,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = stop.cancelled() => {
            terminate(&mut child);
            child.wait().await
        }
    };

    peers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();

    let outcome = match status {
        Ok(status) => match TerminationError::from_exit_status(status) {
            // tincd killed by our own signal is a clean stop
            Some(TerminationError::Signalled) if stop.is_cancelled() => None,
            other => other,
        },
        Err(e) => Some(TerminationError::Wait {
            reason: e.to_string(),
        }),
    };

    match &outcome {
        None => info!("tincd exited"),
        Some(e) => warn!("tincd terminated: {}", e),
    }
    completion.fire(outcome);
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!("Failed to send SIGTERM to tincd {}: {}, killing", pid, e);
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill tincd: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_arguments() {
        let launcher = TincdLauncher::default().with_debug_level(5);
        let args = launcher.arguments(Path::new("/etc/tinc/office"));
        assert_eq!(
            args,
            vec![
                "-D".to_string(),
                "--debug=5".to_string(),
                "--config=/etc/tinc/office".to_string(),
                "--pidfile=/etc/tinc/office/pid.run".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_network_dir() {
        let temp_dir = tempdir().unwrap();
        let result = TincdLauncher::default().start(&temp_dir.path().join("absent"));
        assert!(matches!(result, Err(DaemonError::MissingNetwork { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let temp_dir = tempdir().unwrap();
        let launcher = TincdLauncher::new(temp_dir.path().join("no-such-tincd"));
        let result = launcher.start(temp_dir.path());
        assert!(matches!(result, Err(DaemonError::Start { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follows_peers_and_stops() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        // Stand-in for tincd: print a peer change on stderr, then block
        let temp_dir = tempdir().unwrap();
        let script = temp_dir.path().join("fake-tincd");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             echo 'Connection with beta (10.0.0.2 port 655) activated' >&2\n\
             echo 'Connection with alpha (10.0.0.3 port 655) activated' >&2\n\
             exec sleep 30\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let daemon = TincdLauncher::new(&script).start(temp_dir.path()).unwrap();

        let mut peers = Vec::new();
        for _ in 0..50 {
            peers = daemon.peers();
            if peers.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(peers, vec!["alpha".to_string(), "beta".to_string()]);

        daemon.stop();
        daemon.stop();
        tokio::time::timeout(Duration::from_secs(5), daemon.wait())
            .await
            .expect("tincd stand-in should exit on SIGTERM");
        assert_eq!(daemon.termination_error(), None);
        assert!(daemon.peers().is_empty());
    }
}
