//! Shared types for the Atlas ledger gateway.
//!
//! Everything a caller or a ledger adapter needs to speak to the gateway
//! lives here: transaction identifiers and requests, raw and classified
//! proposal responses, commit events, orderer results, endorsement
//! policies and the response envelope returned by every public flow.

pub mod crypto;
pub mod env;
pub mod error;
pub mod transactions;
pub mod utils;

pub use error::{ChannelError, GatewayError, Result};
