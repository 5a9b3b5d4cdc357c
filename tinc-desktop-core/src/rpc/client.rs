//! Controller-side RPC client

use crate::error::WorkerError;
use crate::rpc::{RpcRequest, RpcResponse, METHOD_PEERS, METHOD_STOP};
use crate::supervisor::Worker;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// JSON-RPC client for one worker
pub struct RpcClient {
    base_url: String,
    http: reqwest::Client,
    sequence: AtomicU64,
}

impl RpcClient {
    /// Client posting to `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, WorkerError> {
        // Loopback traffic must never be routed through a proxy
        let http = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| WorkerError::Transport {
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.into(),
            http,
            sequence: AtomicU64::new(0),
        })
    }

    /// Client for a worker listening on `127.0.0.1:port`
    pub fn for_port(port: u16) -> Result<Self, WorkerError> {
        Self::new(format!("http://127.0.0.1:{}/", port))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invoke `method` and decode its result
    pub async fn call<T: DeserializeOwned>(&self, method: &str) -> Result<T, WorkerError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let request = RpcRequest::new(method, sequence);
        debug!("RPC {} #{} -> {}", method, sequence, self.base_url);

        let response = self
            .http
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport)?;

        let body: RpcResponse<T> = response.json().await.map_err(transport)?;

        if let Some(error) = body.error {
            return Err(WorkerError::Remote {
                message: error.message,
            });
        }
        if body.id != sequence {
            return Err(WorkerError::Transport {
                reason: format!(
                    "response id {} does not match request {}",
                    body.id, sequence
                ),
            });
        }
        body.result.ok_or_else(|| WorkerError::Transport {
            reason: "response carries neither result nor error".to_string(),
        })
    }
}

fn transport(e: reqwest::Error) -> WorkerError {
    WorkerError::Transport {
        reason: e.to_string(),
    }
}

#[async_trait]
impl Worker for RpcClient {
    async fn stop(&self) -> Result<bool, WorkerError> {
        self.call(METHOD_STOP).await
    }

    async fn peers(&self) -> Result<Vec<String>, WorkerError> {
        self.call(METHOD_PEERS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_port_url() {
        let client = RpcClient::for_port(41234).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:41234/");
    }

    #[tokio::test]
    async fn test_unreachable_worker_is_transport_error() {
        // Bind and drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = RpcClient::for_port(port).unwrap();
        let result = client.peers().await;
        assert!(matches!(result, Err(WorkerError::Transport { .. })));
    }
}
