//! Session lifecycle: authentication races, heartbeat-driven liveness,
//! and what eviction does (and does not) take with it.

use crate::*;
use trickle_peer::tracker::AuthStatus;

/// Two concurrent authentication attempts for the same username race;
/// exactly one wins, the other is told the account is already active.
#[tokio::test]
async fn concurrent_auth_admits_exactly_one() {
    let tracker = spawn_tracker().await;
    let first = connect(tracker).await;
    let second = connect(tracker).await;

    let (a, b) = tokio::join!(
        first.authenticate("yoda", "wise@!man"),
        second.authenticate("yoda", "wise@!man"),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert!(outcomes.contains(&AuthStatus::Accepted), "{outcomes:?}");
    assert!(outcomes.contains(&AuthStatus::AlreadyActive), "{outcomes:?}");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let tracker = spawn_tracker().await;
    let client = connect(tracker).await;
    assert_eq!(
        client.authenticate("yoda", "wrong").await.unwrap(),
        AuthStatus::Rejected
    );
    // A rejected login leaves the account free.
    assert_eq!(
        client.authenticate("yoda", "wise@!man").await.unwrap(),
        AuthStatus::Accepted
    );
}

/// A heartbeating peer survives many sweep intervals; a silent one is
/// evicted and disappears from the active list.
#[tokio::test]
async fn silent_peer_is_evicted_heartbeating_peer_survives() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    let c3p0 = connect(tracker).await;

    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    c3p0.authenticate("c3p0", "droid#gold").await.unwrap();
    keep_alive(&c3p0, "c3p0");

    tokio::time::sleep(EVICTION_WAIT).await;

    // c3p0 asks who is around: yoda is gone, and c3p0 itself is
    // excluded from its own answer.
    let peers = c3p0.active_peers("c3p0").await.unwrap();
    assert!(peers.is_empty(), "expected yoda evicted, got {peers:?}");
}

/// Scenario: a peer authenticates, publishes, then silently vanishes.
/// Its session times out, and another peer's search for the file now
/// comes back empty — without any unpublish having happened.
#[tokio::test]
async fn search_stops_matching_after_publisher_expires() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    let chewy = connect(tracker).await;

    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    chewy.authenticate("chewy", "wookie+aaaawww").await.unwrap();
    keep_alive(&chewy, "chewy");

    assert!(yoda.publish("yoda", "holocron.txt", 55123).await.unwrap());
    assert_eq!(
        chewy.search("holo", "chewy").await.unwrap(),
        vec!["holocron.txt"]
    );

    // yoda never heartbeats; wait out the sweep.
    tokio::time::sleep(EVICTION_WAIT).await;

    assert!(chewy.search("holo", "chewy").await.unwrap().is_empty());
    assert_eq!(chewy.query_file("holocron.txt", "chewy").await.unwrap(), None);

    // The advertisement itself survived eviction: the publisher's own
    // listing still shows it.
    assert_eq!(
        yoda.published_files("yoda").await.unwrap(),
        vec!["holocron.txt"]
    );
}

/// An evicted username can authenticate again; the tracker rejected the
/// second login only while the first session was live.
#[tokio::test]
async fn eviction_frees_the_username() {
    let tracker = spawn_tracker().await;
    let client = connect(tracker).await;

    client.authenticate("yoda", "wise@!man").await.unwrap();
    assert_eq!(
        client.authenticate("yoda", "wise@!man").await.unwrap(),
        AuthStatus::AlreadyActive
    );

    tokio::time::sleep(EVICTION_WAIT).await;

    assert_eq!(
        client.authenticate("yoda", "wise@!man").await.unwrap(),
        AuthStatus::Accepted
    );
}
