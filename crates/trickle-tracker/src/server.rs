//! UDP receive loop for the tracker.
//!
//! One datagram at a time, in arrival order: decode, dispatch, send the
//! response best-effort. The loop blocks indefinitely on the next
//! datagram and never terminates because of a bad one; a lost response
//! is the requester's problem (their timeout fires) — the tracker never
//! retries a send.

use anyhow::{Context, Result};
use tokio::net::UdpSocket;

use trickle_core::wire::MAX_DATAGRAM;

use crate::dispatch::Tracker;

/// Serve tracker requests on `socket` forever. Cancel by dropping the
/// task handle.
pub async fn serve(socket: UdpSocket, tracker: Tracker) -> Result<()> {
    let local = socket.local_addr().context("tracker socket has no local address")?;
    tracing::info!(addr = %local, "tracker serving");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "recv_from failed");
                continue;
            }
        };

        let Some(response) = tracker.handle_datagram(&buf[..len], source).await else {
            continue;
        };

        let encoded = response.encode();
        if let Err(e) = socket.send_to(encoded.as_bytes(), source).await {
            tracing::warn!(%source, error = %e, "response send failed");
        }
    }
}
