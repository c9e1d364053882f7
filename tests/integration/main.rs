//! Trickle integration test harness.
//!
//! Each test runs a real tracker (UDP serve loop + liveness sweep) and
//! real peers (tracker clients, transfer listeners) in-process on
//! localhost ephemeral ports, with timeouts shortened so eviction paths
//! run in milliseconds. No root, no fixed ports, no shared state
//! between tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use trickle_peer::tracker::TrackerClient;
use trickle_peer::transfer;
use trickle_tracker::{liveness, server, StaticCredentials, Tracker};

mod files;
mod protocol;
mod sessions;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Heartbeat timeout used by every test tracker. The sweep runs at half
/// this, so eviction completes well within a second.
pub const TEST_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(300);

/// Long enough for the sweep to have evicted a silent peer: 1.5× the
/// timeout is the worst case, doubled for scheduling slack.
pub const EVICTION_WAIT: Duration = Duration::from_millis(900);

/// Spawn a tracker with the test credential set. Returns its address.
/// The serve loop and sweep run until the test process exits.
pub async fn spawn_tracker() -> SocketAddr {
    let credentials = Arc::new(StaticCredentials::new(&[
        ("yoda", "wise@!man"),
        ("c3p0", "droid#gold"),
        ("chewy", "wookie+aaaawww"),
    ]));
    let tracker = Tracker::new(credentials);

    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("bind test tracker socket");
    let addr = socket.local_addr().unwrap();

    tokio::spawn(liveness::sweep_loop(tracker.registry(), TEST_HEARTBEAT_TIMEOUT));
    tokio::spawn(server::serve(socket, tracker));
    addr
}

/// A tracker client pointed at the test tracker.
pub async fn connect(tracker: SocketAddr) -> TrackerClient {
    TrackerClient::connect(&tracker.to_string(), Duration::from_secs(2))
        .await
        .expect("connect to test tracker")
}

/// Keep a username alive for the duration of the test.
pub fn keep_alive(client: &TrackerClient, username: &str) {
    tokio::spawn(trickle_peer::tracker::heartbeat_loop(
        client.clone(),
        username.to_string(),
        Duration::from_millis(100),
    ));
}

/// Fresh per-test directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "trickle-it-{tag}-{}-{:?}",
        std::process::id(),
        std::thread::current().id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Start a transfer listener serving `share_dir` on an ephemeral port.
/// Returns the port to publish.
pub async fn spawn_share(share_dir: PathBuf) -> u16 {
    let listener = transfer::bind_listener(0).expect("bind transfer listener");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(transfer::serve_loop(listener, share_dir));
    port
}
