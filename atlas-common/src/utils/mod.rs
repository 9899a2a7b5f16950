//! utils.rs
//!
//! Small value types shared across the gateway: peer names and clock helpers.

pub mod peer_name;
pub use peer_name::PeerName;

pub mod time;
