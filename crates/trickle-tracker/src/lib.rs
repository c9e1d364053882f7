//! trickle-tracker — the tracker's coordination state and protocol.
//!
//! Owns the two shared structures every request touches: the peer
//! registry (who is online) and the file catalog (who serves what).
//! Each sits behind a single mutex; every read and write, including the
//! periodic eviction sweep, goes through that one lock so concurrent
//! handling and eviction always observe a consistent membership set.

pub mod catalog;
pub mod credentials;
pub mod dispatch;
pub mod liveness;
pub mod registry;
pub mod server;

pub use catalog::{Advertisement, FileCatalog, PublishOutcome, UnpublishOutcome};
pub use credentials::{CredentialStore, FileCredentials, StaticCredentials};
pub use dispatch::Tracker;
pub use registry::{AuthOutcome, PeerRegistry};
