//! Peer registry — tracks which usernames are online and when each was
//! last heard from. Authoritative source of liveness.
//!
//! One mutex guards the whole session map. Authentication, heartbeat
//! refresh, and eviction are mutually exclusive by construction, which is
//! what makes "at most one session per username" hold under concurrent
//! authentication attempts.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::credentials::CredentialStore;

/// One authenticated, currently-online peer.
#[derive(Debug, Clone)]
pub struct PeerSession {
    /// Timestamp of the most recent heartbeat (or the authentication
    /// itself, for a fresh session).
    pub last_heartbeat: Instant,
    /// Source address of the most recent message. Logging only — never
    /// used to route file transfers.
    pub source_addr: SocketAddr,
}

/// Result of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    AlreadyActive,
    InvalidCredentials,
}

/// Shared handle to the session map. Cheap to clone.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    sessions: Arc<Mutex<HashMap<String, PeerSession>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate a peer and, on success, create its session.
    ///
    /// The already-active check, the credential check, and the session
    /// insert happen under one lock acquisition: two racing attempts for
    /// the same username cannot both succeed.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        store: &dyn CredentialStore,
        source_addr: SocketAddr,
    ) -> AuthOutcome {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(username) {
            return AuthOutcome::AlreadyActive;
        }
        if !store.verify(username, password) {
            return AuthOutcome::InvalidCredentials;
        }
        sessions.insert(
            username.to_string(),
            PeerSession {
                last_heartbeat: Instant::now(),
                source_addr,
            },
        );
        AuthOutcome::Success
    }

    /// Refresh a session's heartbeat timestamp.
    ///
    /// A heartbeat for a username with no session is dropped: an evicted
    /// or never-authenticated identity cannot establish a session this
    /// way. Later timestamps always win, so reordered heartbeats are
    /// harmless.
    pub async fn record_heartbeat(&self, username: &str, source_addr: SocketAddr) {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(username) {
            Some(session) => {
                session.last_heartbeat = Instant::now();
                session.source_addr = source_addr;
            }
            None => {
                tracing::debug!(user = %username, "heartbeat for unknown session, dropped");
            }
        }
    }

    /// Sorted snapshot of currently-live usernames.
    pub async fn list_active(&self) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut names: Vec<String> = sessions.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn is_active(&self, username: &str) -> bool {
        self.sessions.lock().await.contains_key(username)
    }

    /// Remove every session whose last heartbeat is older than `timeout`
    /// relative to `now`. Returns the evicted usernames for logging.
    pub async fn evict_expired(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_heartbeat) > timeout)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &expired {
            sessions.remove(name);
        }
        expired
    }
}
