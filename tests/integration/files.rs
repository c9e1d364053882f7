//! Publish, search, query, and the direct peer-to-peer download.

use crate::*;
use trickle_peer::transfer;

/// The full happy path: A publishes, B searches and finds it, B
/// resolves a (host, port), connects directly, and the downloaded bytes
/// match A's source file exactly.
#[tokio::test]
async fn publish_search_query_download_end_to_end() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    let chewy = connect(tracker).await;

    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    chewy.authenticate("chewy", "wookie+aaaawww").await.unwrap();
    keep_alive(&yoda, "yoda");
    keep_alive(&chewy, "chewy");

    // A serves a share directory containing notes.txt.
    let share = temp_dir("share-a");
    let content = b"these are not the droids you are looking for\n".repeat(200);
    std::fs::write(share.join("notes.txt"), &content).unwrap();
    let port = spawn_share(share).await;
    assert!(yoda.publish("yoda", "notes.txt", port).await.unwrap());

    // B finds it by substring.
    assert_eq!(
        chewy.search("note", "chewy").await.unwrap(),
        vec!["notes.txt"]
    );

    // B resolves and downloads directly from A.
    let (host, resolved_port) = chewy
        .query_file("notes.txt", "chewy")
        .await
        .unwrap()
        .expect("query should resolve a live publisher");
    assert_eq!(resolved_port, port);

    let dest = temp_dir("dest-b");
    let path = transfer::download(
        host,
        resolved_port,
        "notes.txt",
        &dest,
        std::time::Duration::from_secs(2),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(path).unwrap(), content);
}

/// Scenario: B tries to unpublish A's file using B's own address and
/// port. The tracker refuses, and A's advertisement is untouched.
#[tokio::test]
async fn unpublish_by_non_owner_fails_and_leaves_advertisement() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    let c3p0 = connect(tracker).await;

    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    c3p0.authenticate("c3p0", "droid#gold").await.unwrap();
    keep_alive(&yoda, "yoda");
    keep_alive(&c3p0, "c3p0");

    assert!(yoda.publish("yoda", "x.txt", 55123).await.unwrap());

    // Same filename, but c3p0's identity and a different port.
    assert!(!c3p0.unpublish("c3p0", "x.txt", 55200).await.unwrap());
    // Right owner and filename, wrong port: also refused.
    assert!(!yoda.unpublish("yoda", "x.txt", 55124).await.unwrap());

    // A's advertisement still resolves.
    assert!(c3p0.query_file("x.txt", "c3p0").await.unwrap().is_some());

    // The exact triple removes it, and a second attempt finds nothing.
    assert!(yoda.unpublish("yoda", "x.txt", 55123).await.unwrap());
    assert!(!yoda.unpublish("yoda", "x.txt", 55123).await.unwrap());
    assert_eq!(c3p0.query_file("x.txt", "c3p0").await.unwrap(), None);
}

/// Republishing the same file is idempotent: one unpublish clears it.
#[tokio::test]
async fn republish_is_idempotent() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    keep_alive(&yoda, "yoda");

    assert!(yoda.publish("yoda", "plans.txt", 55123).await.unwrap());
    assert!(yoda.publish("yoda", "plans.txt", 55123).await.unwrap());
    assert_eq!(yoda.published_files("yoda").await.unwrap(), vec!["plans.txt"]);

    assert!(yoda.unpublish("yoda", "plans.txt", 55123).await.unwrap());
    assert!(yoda.published_files("yoda").await.unwrap().is_empty());
}

/// A search that only matches the requester's own files is an explicit
/// empty result, not an error.
#[tokio::test]
async fn search_never_returns_only_own_files() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    keep_alive(&yoda, "yoda");

    assert!(yoda.publish("yoda", "only-mine.txt", 55123).await.unwrap());
    assert!(yoda.search("mine", "yoda").await.unwrap().is_empty());
}

/// Two publishers for one filename: the tracker resolves the first
/// inserted while both are live, then falls back to the survivor.
#[tokio::test]
async fn resolve_falls_back_to_the_second_publisher() {
    let tracker = spawn_tracker().await;
    let yoda = connect(tracker).await;
    let c3p0 = connect(tracker).await;
    let chewy = connect(tracker).await;

    yoda.authenticate("yoda", "wise@!man").await.unwrap();
    c3p0.authenticate("c3p0", "droid#gold").await.unwrap();
    chewy.authenticate("chewy", "wookie+aaaawww").await.unwrap();
    keep_alive(&c3p0, "c3p0");
    keep_alive(&chewy, "chewy");

    // yoda publishes first, then c3p0; yoda will go silent.
    assert!(yoda.publish("yoda", "shared.txt", 55001).await.unwrap());
    assert!(c3p0.publish("c3p0", "shared.txt", 55002).await.unwrap());

    let (_, port) = chewy
        .query_file("shared.txt", "chewy")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(port, 55001, "insertion order decides among live publishers");

    tokio::time::sleep(EVICTION_WAIT).await;

    let (_, port) = chewy
        .query_file("shared.txt", "chewy")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(port, 55002, "dead first publisher is skipped");
}
