//! Loopback control plane
//!
//! JSON-RPC 2.0 over HTTP POST to `http://127.0.0.1:<port>/`. Each call
//! carries the client's sequence number both as its only parameter and as
//! the request id.

use serde::{Deserialize, Serialize};

pub mod client;
pub mod server;

pub use client::RpcClient;
pub use server::{router, run_worker, serve};

/// Request graceful daemon shutdown; result is `true` once requested
pub const METHOD_STOP: &str = "Worker.Stop";

/// List currently connected peers; result is an array of names
pub const METHOD_PEERS: &str = "Worker.Peers";

/// JSON-RPC error code for an unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;

const JSONRPC_VERSION: &str = "2.0";

/// Control request sent to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<u64>,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: &str, sequence: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: vec![sequence],
            id: sequence,
        }
    }
}

/// Worker reply; exactly one of `result` and `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    pub id: u64,
}

impl<T> RpcResponse<T> {
    pub fn success(id: u64, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}
