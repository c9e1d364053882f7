//! Wire-level behavior against a live tracker socket: raw datagrams in,
//! exact keywords out.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use trickle_core::wire::MAX_DATAGRAM;

use crate::*;

async fn raw_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

/// Send one raw datagram and collect the reply, if any arrives in time.
async fn send_raw(socket: &UdpSocket, tracker: SocketAddr, text: &str) -> Option<String> {
    socket.send_to(text.as_bytes(), tracker).await.unwrap();
    let mut buf = [0u8; MAX_DATAGRAM];
    match tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(String::from_utf8_lossy(&buf[..len]).to_string()),
        _ => None,
    }
}

#[tokio::test]
async fn exact_response_keywords() {
    let tracker = spawn_tracker().await;
    let socket = raw_socket().await;

    assert_eq!(
        send_raw(&socket, tracker, "AUTH yoda wise@!man").await.as_deref(),
        Some("AUTH_SUCCESS")
    );
    assert_eq!(
        send_raw(&socket, tracker, "AUTH yoda wise@!man").await.as_deref(),
        Some("AUTH_ALREADY_ACTIVE")
    );
    assert_eq!(
        send_raw(&socket, tracker, "AUTH vader iamyourfather").await.as_deref(),
        Some("AUTH_FAILED")
    );
    assert_eq!(
        send_raw(&socket, tracker, "PUBLISH yoda notes.txt 55123").await.as_deref(),
        Some("PUB_SUCCESS")
    );
    assert_eq!(
        send_raw(&socket, tracker, "LIST_FILES yoda").await.as_deref(),
        Some("PUBLISHED_FILES notes.txt")
    );
    assert_eq!(
        send_raw(&socket, tracker, "UNPUBLISH yoda notes.txt 55123").await.as_deref(),
        Some("UNPUB_SUCCESS")
    );
    assert_eq!(
        send_raw(&socket, tracker, "LIST_FILES yoda").await.as_deref(),
        Some("FAIL_PUBLISHED_FILES")
    );
}

/// Malformed known commands draw that command's failure keyword; a bad
/// datagram never takes the tracker down.
#[tokio::test]
async fn malformed_requests_get_failure_keywords() {
    let tracker = spawn_tracker().await;
    let socket = raw_socket().await;

    assert_eq!(
        send_raw(&socket, tracker, "PUBLISH yoda notes.txt eleven").await.as_deref(),
        Some("PUB_FAIL")
    );
    assert_eq!(
        send_raw(&socket, tracker, "QUERY_FILE notes.txt").await.as_deref(),
        Some("QUERY_FAIL")
    );
    assert_eq!(
        send_raw(&socket, tracker, "SEARCH_FILES").await.as_deref(),
        Some("FAIL_FOUND_FILES")
    );

    // Still serving after the garbage.
    assert_eq!(
        send_raw(&socket, tracker, "AUTH c3p0 droid#gold").await.as_deref(),
        Some("AUTH_SUCCESS")
    );
}

/// Unrecognized keywords and heartbeats are never answered.
#[tokio::test]
async fn silent_drops() {
    let tracker = spawn_tracker().await;
    let socket = raw_socket().await;

    assert_eq!(send_raw(&socket, tracker, "FROBNICATE a b").await, None);
    assert_eq!(send_raw(&socket, tracker, "HEARTBEAT ghost").await, None);

    send_raw(&socket, tracker, "AUTH yoda wise@!man").await;
    assert_eq!(send_raw(&socket, tracker, "HEARTBEAT yoda").await, None);
}
