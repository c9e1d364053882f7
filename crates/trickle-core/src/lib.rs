//! trickle-core — wire codec and configuration shared by the tracker
//! daemon and the peer. All other Trickle crates depend on this one.

pub mod config;
pub mod wire;

pub use wire::{Request, Response, WireError};
