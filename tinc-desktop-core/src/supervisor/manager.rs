//! Worker registry
//!
//! The manager is the only authority on whether a network is running. It
//! holds at most one [`Port`] per network and drops the entry once the
//! worker's completion fires.

use crate::error::SpawnError;
use crate::supervisor::event::WorkerEvent;
use crate::supervisor::port::Port;
use crate::supervisor::spawner::Spawner;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Capacity of the lifecycle event channel
const EVENT_CAPACITY: usize = 64;

type Registry = Arc<Mutex<HashMap<String, Port>>>;

/// Supervisor of running workers
pub struct Manager {
    spawner: Arc<dyn Spawner>,
    workers: Registry,
    events: broadcast::Sender<WorkerEvent>,
}

impl Manager {
    /// Create an empty manager spawning through `spawner`
    pub fn new(spawner: Arc<dyn Spawner>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            spawner,
            workers: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Registered worker for `name`, if any
    pub fn find(&self, name: &str) -> Option<Port> {
        lock(&self.workers).get(name).cloned()
    }

    /// Snapshot of registered network names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.workers).keys().cloned().collect();
        names.sort();
        names
    }

    /// Return the worker for `name`, spawning one if none is registered
    ///
    /// Concurrent callers for the same name all receive the same handle and
    /// the spawner runs once. A spawn failure leaves the registry untouched,
    /// so the call can simply be retried.
    #[tracing::instrument(skip(self))]
    pub fn ensure_running(&self, name: &str) -> Result<Port, SpawnError> {
        let port = {
            let mut workers = lock(&self.workers);
            if let Some(port) = workers.get(name) {
                debug!("Worker for {} already registered", name);
                return Ok(port.clone());
            }

            let port = self.spawner.spawn(name)?;
            workers.insert(name.to_string(), port.clone());
            port
        };

        info!("Worker for {} started", name);
        let _ = self.events.send(WorkerEvent::Started {
            name: name.to_string(),
        });
        self.watch(port.clone());
        Ok(port)
    }

    /// Receive lifecycle events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Stop every registered worker, each bounded by `timeout`
    ///
    /// Workers are stopped concurrently. Failures are logged and do not
    /// abort the sweep.
    pub async fn stop_all(&self, timeout: Duration) {
        let ports: Vec<Port> = lock(&self.workers).values().cloned().collect();
        if ports.is_empty() {
            return;
        }
        info!("Stopping {} worker(s)", ports.len());

        let mut stops = JoinSet::new();
        for port in ports {
            stops.spawn(async move {
                match port.stop(timeout).await {
                    Ok(true) => {}
                    Ok(false) => warn!("Worker for {} refused to stop", port.name()),
                    Err(e) => warn!("Failed to stop worker for {}: {}", port.name(), e),
                }
                if tokio::time::timeout(timeout, port.done()).await.is_err() {
                    warn!(
                        "Worker for {} still running after {:?}",
                        port.name(),
                        timeout
                    );
                }
            });
        }
        while stops.join_next().await.is_some() {}
    }

    /// Drop the registry entry once `port` terminates
    fn watch(&self, port: Port) {
        let workers = Arc::clone(&self.workers);
        let events = self.events.clone();
        tokio::spawn(async move {
            port.done().await;
            let error = port.error();
            match &error {
                None => info!("Worker for {} stopped", port.name()),
                Some(e) => warn!("Worker for {} terminated: {}", port.name(), e),
            }

            {
                let mut workers = lock(&workers);
                // A newer worker may already own the name
                if workers.get(port.name()).is_some_and(|p| p.ptr_eq(&port)) {
                    workers.remove(port.name());
                }
            }

            let _ = events.send(WorkerEvent::Stopped {
                name: port.name().to_string(),
                error,
            });
        });
    }
}

fn lock(workers: &Registry) -> MutexGuard<'_, HashMap<String, Port>> {
    workers.lock().unwrap_or_else(PoisonError::into_inner)
}
