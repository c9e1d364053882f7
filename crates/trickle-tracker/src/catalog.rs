//! File catalog — maps a filename to the peers currently advertising it.
//!
//! Publication and liveness are decoupled: an advertisement stays in the
//! catalog until its publisher explicitly unpublishes it, even if the
//! publisher's session has long expired. Queries compensate by filtering
//! on liveness at read time, so a transient missed heartbeat never costs
//! a peer its listing.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

/// One peer's claim to serve one file at one address.
///
/// Identity within a filename is the full `(publisher, host, port)`
/// triple: the same peer republishing is idempotent, and two peers may
/// advertise the same filename side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub filename: String,
    pub publisher: String,
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Inserted, or already present (idempotent).
    Published,
    /// Rejected: empty filename.
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpublishOutcome {
    Removed,
    /// No advertisement matches the exact `(publisher, host, port)`
    /// triple for that filename. A non-owner's attempt lands here too —
    /// indistinguishable on purpose.
    NotFound,
}

/// Per-filename entry, insertion-ordered so `resolve` is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Advertiser {
    publisher: String,
    host: IpAddr,
    port: u16,
}

/// Shared handle to the catalog. Cheap to clone. One mutex guards the
/// whole map; no per-filename locking.
#[derive(Clone, Default)]
pub struct FileCatalog {
    files: Arc<Mutex<HashMap<String, Vec<Advertiser>>>>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an advertisement. Re-publishing an identical triple is a
    /// success with no duplicate entry.
    pub async fn publish(
        &self,
        filename: &str,
        publisher: &str,
        host: IpAddr,
        port: u16,
    ) -> PublishOutcome {
        if filename.is_empty() {
            return PublishOutcome::Malformed;
        }
        let advertiser = Advertiser {
            publisher: publisher.to_string(),
            host,
            port,
        };
        let mut files = self.files.lock().await;
        let entries = files.entry(filename.to_string()).or_default();
        if !entries.contains(&advertiser) {
            entries.push(advertiser);
        }
        PublishOutcome::Published
    }

    /// Remove the advertisement matching the exact triple. Only the
    /// publisher that created an entry can remove it; a mismatched
    /// username, host, or port is `NotFound`.
    pub async fn unpublish(
        &self,
        filename: &str,
        publisher: &str,
        host: IpAddr,
        port: u16,
    ) -> UnpublishOutcome {
        let mut files = self.files.lock().await;
        let Some(entries) = files.get_mut(filename) else {
            return UnpublishOutcome::NotFound;
        };
        let before = entries.len();
        entries.retain(|a| !(a.publisher == publisher && a.host == host && a.port == port));
        if entries.len() == before {
            return UnpublishOutcome::NotFound;
        }
        if entries.is_empty() {
            files.remove(filename);
        }
        UnpublishOutcome::Removed
    }

    /// All filenames with at least one advertisement by `publisher`,
    /// sorted. Liveness-independent by design.
    pub async fn list_published_by(&self, publisher: &str) -> Vec<String> {
        let files = self.files.lock().await;
        let mut names: Vec<String> = files
            .iter()
            .filter(|(_, entries)| entries.iter().any(|a| a.publisher == publisher))
            .map(|(filename, _)| filename.clone())
            .collect();
        names.sort();
        names
    }

    /// Filenames containing `substring` that some peer other than
    /// `exclude` currently advertises with a live session. A filename
    /// disqualified through one advertiser can still match through
    /// another.
    pub async fn search(
        &self,
        substring: &str,
        exclude: &str,
        is_live: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        let files = self.files.lock().await;
        let mut names: Vec<String> = files
            .iter()
            .filter(|(filename, entries)| {
                filename.contains(substring)
                    && entries
                        .iter()
                        .any(|a| a.publisher != exclude && is_live(&a.publisher))
            })
            .map(|(filename, _)| filename.clone())
            .collect();
        names.sort();
        names
    }

    /// First advertisement for `filename` with a live publisher, in
    /// insertion order. Deterministic: repeated queries against unchanged
    /// state pick the same peer.
    pub async fn resolve(
        &self,
        filename: &str,
        is_live: impl Fn(&str) -> bool,
    ) -> Option<Advertisement> {
        let files = self.files.lock().await;
        files.get(filename)?.iter().find(|a| is_live(&a.publisher)).map(|a| {
            Advertisement {
                filename: filename.to_string(),
                publisher: a.publisher.clone(),
                host: a.host,
                port: a.port,
            }
        })
    }
}
