//! trickled — Trickle tracker daemon.
//!
//! Binds one UDP socket, spawns the liveness sweep, and serves requests
//! until killed. All state is in-memory and gone on restart.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;

use trickle_core::config::TrickleConfig;
use trickle_tracker::{liveness, server, FileCredentials, Tracker};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = TrickleConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TrickleConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TrickleConfig::default()
    });

    // Optional positional port override, matching `trickled <port>`.
    let port = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid port argument: {arg}"))?,
        None => config.tracker.port,
    };

    let credentials_path = &config.tracker.credentials_path;
    tracing::info!(path = %credentials_path.display(), "credentials file");
    let credentials = Arc::new(FileCredentials::new(credentials_path));

    let tracker = Tracker::new(credentials);

    let timeout = config.tracker.heartbeat_timeout();
    let sweep = tokio::spawn(liveness::sweep_loop(tracker.registry(), timeout));
    tracing::info!(timeout_secs = config.tracker.heartbeat_timeout_secs, "liveness sweep started");

    let socket = UdpSocket::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind tracker socket on port {port}"))?;

    let result = server::serve(socket, tracker).await;
    sweep.abort();
    result
}
