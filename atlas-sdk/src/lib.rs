//! Client-side transaction gateway for a permissioned ledger.
//!
//! A request is endorsed by every targeted peer, then submitted to the
//! ordering service while commit listeners on the organization's peers wait
//! for the block event. The result is always a
//! [`ResponseEnvelope`](atlas_common::env::ResponseEnvelope).

pub mod aggregator;
pub mod commit;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod endorsement;
pub mod gateway;
pub mod in_memory;
pub mod logging;
pub mod metrics;
pub mod order;
pub mod policy;
pub mod ports;

pub use config::GatewayConfig;
pub use coordinator::{CommitCoordinator, CoordinatorState, FlowKind, FlowSpec, RequestOutcome};
pub use gateway::Gateway;
