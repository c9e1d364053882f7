//! trickle-peer — the peer side of Trickle.
//!
//! A peer authenticates against the tracker, keeps its session alive
//! with heartbeats, advertises files, and transfers file bytes directly
//! to other peers over TCP once the tracker has resolved a publisher.

pub mod port;
pub mod tracker;
pub mod transfer;

pub use port::derive_port;
pub use tracker::{AuthStatus, ClientError, TrackerClient};
pub use transfer::TransferError;
