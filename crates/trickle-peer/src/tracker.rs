//! Tracker client — one UDP request, at most one response, one timeout.
//!
//! Protocol rejections (`AUTH_FAILED`, `QUERY_FAIL`, ...) are normal
//! outcomes and come back as typed results. A lost request or response
//! surfaces as [`ClientError::Timeout`] after the fixed deadline; the
//! client never retries. A lost response is a user-visible failure.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};

use trickle_core::wire::{Request, Response, WireError, MAX_DATAGRAM};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not resolve tracker address {0:?}")]
    BadTrackerAddr(String),
    #[error("tracker did not respond within the timeout")]
    Timeout,
    #[error("tracker sent an uninterpretable response: {0}")]
    BadResponse(#[from] WireError),
    #[error("tracker sent an unexpected response: {0:?}")]
    UnexpectedResponse(Response),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of an authentication exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Accepted,
    AlreadyActive,
    Rejected,
}

/// Handle to the tracker. Cheap to clone; all clones share one UDP
/// socket, so exchanges must not run concurrently with each other (the
/// heartbeat sender is fine — heartbeats are never answered).
#[derive(Clone)]
pub struct TrackerClient {
    socket: Arc<UdpSocket>,
    tracker: SocketAddr,
    timeout: Duration,
}

impl TrackerClient {
    /// Bind a local socket and resolve the tracker's address.
    pub async fn connect(tracker: &str, timeout: Duration) -> Result<Self, ClientError> {
        let addr = lookup_host(tracker)
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ClientError::BadTrackerAddr(tracker.to_string()))?;
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            socket: Arc::new(socket),
            tracker: addr,
            timeout,
        })
    }

    /// Send one request and wait for one response, bounded by the
    /// configured timeout.
    async fn exchange(&self, request: Request) -> Result<Response, ClientError> {
        let encoded = request.encode();
        self.socket.send_to(encoded.as_bytes(), self.tracker).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let len = loop {
            let recv = tokio::time::timeout(self.timeout, self.socket.recv_from(&mut buf));
            match recv.await {
                Ok(Ok((len, source))) if source == self.tracker => break len,
                // Datagram from somewhere else; keep waiting.
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(ClientError::Timeout),
            }
        };
        let text = String::from_utf8_lossy(&buf[..len]);
        Ok(Response::parse(&text)?)
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthStatus, ClientError> {
        let response = self
            .exchange(Request::Auth {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        match response {
            Response::AuthSuccess => Ok(AuthStatus::Accepted),
            Response::AuthAlreadyActive => Ok(AuthStatus::AlreadyActive),
            Response::AuthFailed => Ok(AuthStatus::Rejected),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Fire one heartbeat. No response is expected, so there is nothing
    /// to wait for.
    pub async fn send_heartbeat(&self, username: &str) -> Result<(), ClientError> {
        let encoded = Request::Heartbeat {
            username: username.to_string(),
        }
        .encode();
        self.socket.send_to(encoded.as_bytes(), self.tracker).await?;
        Ok(())
    }

    /// Active usernames other than ours.
    pub async fn active_peers(&self, username: &str) -> Result<Vec<String>, ClientError> {
        let response = self
            .exchange(Request::ActivePeers {
                username: username.to_string(),
            })
            .await?;
        match response {
            Response::ActivePeers(names) => Ok(names),
            Response::ActivePeersFail => Ok(Vec::new()),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Advertise a file. `Ok(false)` is the tracker's `PUB_FAIL`.
    pub async fn publish(
        &self,
        username: &str,
        filename: &str,
        port: u16,
    ) -> Result<bool, ClientError> {
        let response = self
            .exchange(Request::Publish {
                username: username.to_string(),
                filename: filename.to_string(),
                port,
            })
            .await?;
        match response {
            Response::PubSuccess => Ok(true),
            Response::PubFail => Ok(false),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Withdraw an advertisement. `Ok(false)` is `UNPUB_FAIL` — not
    /// found, or not ours to withdraw (the wire does not say which).
    pub async fn unpublish(
        &self,
        username: &str,
        filename: &str,
        port: u16,
    ) -> Result<bool, ClientError> {
        let response = self
            .exchange(Request::Unpublish {
                username: username.to_string(),
                filename: filename.to_string(),
                port,
            })
            .await?;
        match response {
            Response::UnpubSuccess => Ok(true),
            Response::UnpubFail => Ok(false),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Files we currently advertise. Empty when the tracker has none.
    pub async fn published_files(&self, username: &str) -> Result<Vec<String>, ClientError> {
        let response = self
            .exchange(Request::ListFiles {
                username: username.to_string(),
            })
            .await?;
        match response {
            Response::PublishedFiles(names) => Ok(names),
            Response::FailPublishedFiles => Ok(Vec::new()),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Filenames matching `substring` served by other live peers.
    pub async fn search(
        &self,
        substring: &str,
        username: &str,
    ) -> Result<Vec<String>, ClientError> {
        let response = self
            .exchange(Request::SearchFiles {
                substring: substring.to_string(),
                username: username.to_string(),
            })
            .await?;
        match response {
            Response::FoundFiles(names) => Ok(names),
            Response::FailFoundFiles => Ok(Vec::new()),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Resolve a filename to a live publisher's transfer address.
    pub async fn query_file(
        &self,
        filename: &str,
        username: &str,
    ) -> Result<Option<(IpAddr, u16)>, ClientError> {
        let response = self
            .exchange(Request::QueryFile {
                filename: filename.to_string(),
                username: username.to_string(),
            })
            .await?;
        match response {
            Response::QuerySuccess { host, port } => Ok(Some((host, port))),
            Response::QueryFail => Ok(None),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }
}

/// Send a heartbeat every `interval` forever. Cancel by dropping the
/// task handle. Send errors are logged and the loop keeps going; the
/// tracker evicting us is the visible consequence of a dead link.
pub async fn heartbeat_loop(
    client: TrackerClient,
    username: String,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(e) = client.send_heartbeat(&username).await {
            tracing::warn!(user = %username, error = %e, "heartbeat send failed");
        }
    }
}
