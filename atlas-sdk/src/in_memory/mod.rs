//! A scriptable ledger network that lives in process memory.
//!
//! Peers endorse with real ed25519 signatures, the orderer checks them,
//! and accepted transactions are delivered as block events to every peer
//! on the channel. Each peer's endorsement and commit behaviour can be
//! changed at runtime, which is what the integration tests and the
//! `gateway-sim` binary rely on.

pub mod network;
pub mod peer;

pub use network::{InMemoryNetwork, InMemoryNetworkBuilder, OrdererBehavior};
pub use peer::{verify_endorsement, CommitBehavior, EndorseBehavior, InMemoryPeer};
