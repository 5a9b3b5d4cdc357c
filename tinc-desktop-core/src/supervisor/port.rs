//! Worker handle
//!
//! A `Port` is the controller's view of one running worker, whether it is
//! an in-process daemon or an elevated sub-process reached over loopback.

use crate::error::{TerminationError, WorkerError};
use crate::supervisor::completion::Completion;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Control operations a worker answers
#[async_trait]
pub trait Worker: Send + Sync {
    /// Request graceful termination; `true` when the worker accepted it
    async fn stop(&self) -> Result<bool, WorkerError>;

    /// Names of the peers currently connected
    async fn peers(&self) -> Result<Vec<String>, WorkerError>;
}

struct PortInner {
    name: String,
    api: Arc<dyn Worker>,
    completion: Completion,
}

/// Handle to one live worker for a network
///
/// Cheap to clone; clones refer to the same worker (see [`Port::ptr_eq`]).
#[derive(Clone)]
pub struct Port {
    inner: Arc<PortInner>,
}

impl Port {
    /// Assemble a handle from its control client and completion signal
    pub fn new(name: impl Into<String>, api: Arc<dyn Worker>, completion: Completion) -> Self {
        Self {
            inner: Arc::new(PortInner {
                name: name.into(),
                api,
                completion,
            }),
        }
    }

    /// Network this worker runs
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Completion signal of the underlying process or daemon
    pub fn completion(&self) -> &Completion {
        &self.inner.completion
    }

    /// Wait until the worker terminates
    pub async fn done(&self) {
        self.inner.completion.wait().await
    }

    /// Termination error; read it only after [`Port::done`] resolved
    pub fn error(&self) -> Option<TerminationError> {
        self.inner.completion.termination_error()
    }

    /// Whether both handles refer to the same worker
    pub fn ptr_eq(&self, other: &Port) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stop the worker and wait until it is gone, bounded by `timeout`
    ///
    /// Safe to call repeatedly: a worker that already terminated counts as
    /// stopped. When the deadline elapses the worker keeps shutting down in
    /// the background and completion still fires later.
    #[tracing::instrument(skip(self), fields(network = %self.name()))]
    pub async fn stop(&self, timeout: Duration) -> Result<bool, WorkerError> {
        let completion = &self.inner.completion;
        if completion.is_fired() {
            debug!("Worker already terminated");
            return Ok(true);
        }

        let call = async {
            let confirmed = tokio::select! {
                result = self.inner.api.stop() => match result {
                    Ok(confirmed) => confirmed,
                    // The transport may break because the worker exited mid-call
                    Err(e) if e.is_transport() && completion.is_fired() => return Ok(true),
                    Err(e) => return Err(e),
                },
                _ = completion.wait() => return Ok(true),
            };
            if confirmed {
                completion.wait().await;
            }
            Ok(confirmed)
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout {
                millis: timeout.as_millis() as u64,
            }),
        }
    }

    /// Current peers of the worker
    ///
    /// Fails fast with [`WorkerError::Gone`] once the worker terminated,
    /// including when it terminates while the call is in flight.
    pub async fn peers(&self) -> Result<Vec<String>, WorkerError> {
        let completion = &self.inner.completion;
        if completion.is_fired() {
            return Err(WorkerError::Gone);
        }

        tokio::select! {
            result = self.inner.api.peers() => result,
            _ = completion.wait() => Err(WorkerError::Gone),
        }
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.inner.name)
            .field("done", &self.inner.completion.is_fired())
            .finish()
    }
}
