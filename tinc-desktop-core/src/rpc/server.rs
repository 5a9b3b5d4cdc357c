//! Worker-side RPC server
//!
//! Runs inside an elevated worker process and exposes its single daemon to
//! the controller.

use crate::daemon::{Daemon, DaemonLauncher};
use crate::error::DesktopError;
use crate::rpc::{RpcRequest, RpcResponse, METHOD_NOT_FOUND, METHOD_PEERS, METHOD_STOP};
use crate::supervisor::spawner::validate_network_name;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long in-flight replies get to drain once the daemon is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Router answering control calls against `daemon`
pub fn router(daemon: Arc<dyn Daemon>) -> Router {
    Router::new().route("/", post(handle)).with_state(daemon)
}

async fn handle(
    State(daemon): State<Arc<dyn Daemon>>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse<Value>> {
    debug!("RPC {} #{}", request.method, request.id);
    let response = match request.method.as_str() {
        METHOD_STOP => {
            // Only requests shutdown; the process exits once the daemon is done
            daemon.stop();
            RpcResponse::success(request.id, json!(true))
        }
        METHOD_PEERS => RpcResponse::success(request.id, json!(daemon.peers())),
        other => RpcResponse::failure(
            request.id,
            METHOD_NOT_FOUND,
            format!("unknown method {}", other),
        ),
    };
    Json(response)
}

/// Serve control calls on `listener` until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    daemon: Arc<dyn Daemon>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(daemon))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Worker-mode main loop
///
/// Binds the control port, starts the daemon for `network` and returns once
/// the daemon terminated. An error result carries the daemon's termination
/// error, so the process exit status reflects it.
#[tracing::instrument(skip(config_dir, launcher))]
pub async fn run_worker(
    config_dir: &Path,
    port: u16,
    network: &str,
    launcher: Arc<dyn DaemonLauncher>,
) -> Result<(), DesktopError> {
    validate_network_name(network)?;

    // Bind before starting the daemon so a taken port fails fast
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
    let daemon = launcher.start(&config_dir.join(network))?;
    info!("Worker for {} listening on 127.0.0.1:{}", network, port);

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(serve(listener, Arc::clone(&daemon), shutdown.clone()));

    let server_finished = tokio::select! {
        _ = daemon.wait() => {
            info!("Daemon for {} terminated", network);
            false
        }
        result = &mut server => {
            match result {
                Ok(Ok(())) => warn!("Control server stopped unexpectedly"),
                Ok(Err(e)) => error!("Control server failed: {}", e),
                Err(e) => error!("Control server task failed: {}", e),
            }
            // Without a control plane nobody can stop the daemon later
            daemon.stop();
            daemon.wait().await;
            true
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping daemon for {}", network);
            daemon.stop();
            daemon.wait().await;
            false
        }
    };

    shutdown.cancel();
    if !server_finished && tokio::time::timeout(DRAIN_TIMEOUT, &mut server).await.is_err() {
        debug!("Control server did not drain in time");
        server.abort();
    }

    match daemon.termination_error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
