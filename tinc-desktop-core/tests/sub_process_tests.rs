//! Tests for the sub-process spawner
//!
//! Uses `true` and `false` as stand-in worker executables: both ignore the
//! worker flags and exit at once, which is enough to exercise completion
//! and registry reclamation without elevation.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tinc_desktop_core::config::WorkerSettings;
use tinc_desktop_core::elevation::Elevation;
use tinc_desktop_core::error::{TerminationError, WorkerError};
use tinc_desktop_core::supervisor::{Manager, Spawner, SubProcessSpawner};

fn spawner(executable: &str) -> SubProcessSpawner {
    SubProcessSpawner::new(PathBuf::from("/tmp"), WorkerSettings::default())
        .with_elevation(Elevation::None)
        .with_executable(executable)
}

#[tokio::test]
async fn test_clean_exit_fires_completion() {
    let port = spawner("true").spawn("office").unwrap();

    tokio::time::timeout(Duration::from_secs(5), port.done())
        .await
        .expect("process should exit");
    assert_eq!(port.error(), None);
    assert_eq!(port.peers().await, Err(WorkerError::Gone));
    assert_eq!(port.stop(Duration::from_secs(1)).await, Ok(true));
}

#[tokio::test]
async fn test_failed_exit_is_captured() {
    let port = spawner("false").spawn("office").unwrap();

    tokio::time::timeout(Duration::from_secs(5), port.done())
        .await
        .expect("process should exit");
    assert_eq!(port.error(), Some(TerminationError::ExitStatus { code: 1 }));
}

#[tokio::test]
async fn test_exited_process_is_reclaimed() {
    let manager = Manager::new(Arc::new(spawner("true")));
    let port = manager.ensure_running("office").unwrap();

    tokio::time::timeout(Duration::from_secs(5), port.done())
        .await
        .expect("process should exit");
    for _ in 0..200 {
        if manager.find("office").is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("office was never removed from the registry");
}
