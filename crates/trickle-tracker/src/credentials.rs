//! Credential store — the external collaborator consulted during
//! authentication. The tracker only ever asks one question: does this
//! username/password pair check out?

use std::path::PathBuf;

/// Verifier consulted by [`crate::PeerRegistry::authenticate`].
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Line-oriented credentials file: one `username password` pair per line,
/// whitespace-separated; the password runs to end of line. Re-read on
/// every lookup so edits take effect without a restart.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "credentials file unreadable");
                return false;
            }
        };
        for line in text.lines() {
            let Some((stored_user, stored_pass)) = line.trim().split_once(char::is_whitespace)
            else {
                continue;
            };
            if stored_user == username && stored_pass.trim_start() == password {
                return true;
            }
        }
        false
    }
}

/// Fixed in-memory credential set. Used by tests and embedded trackers.
pub struct StaticCredentials {
    pairs: Vec<(String, String)>,
}

impl StaticCredentials {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|(u, p)| (u.to_string(), p.to_string()))
                .collect(),
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.pairs
            .iter()
            .any(|(u, p)| u == username && p == password)
    }
}
