//! Liveness sweep — periodically evicts sessions that stopped
//! heartbeating.
//!
//! Runs at half the heartbeat timeout so a silent peer is gone within
//! 1.5× the timeout at worst. Touches only the registry: advertisements
//! outlive their publisher's liveness and are removed by explicit
//! unpublish alone, with queries filtering on liveness at read time.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::registry::PeerRegistry;

/// Evict expired sessions forever. Cancel by dropping the task handle.
pub async fn sweep_loop(registry: PeerRegistry, timeout: Duration) -> Result<()> {
    let mut interval = tokio::time::interval(timeout / 2);
    // The first tick fires immediately; harmless, nothing is stale yet.
    loop {
        interval.tick().await;

        let evicted = registry.evict_expired(Instant::now(), timeout).await;
        for username in &evicted {
            tracing::info!(user = %username, "peer evicted, heartbeat timeout");
        }
    }
}
