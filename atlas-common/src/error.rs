// src/error.rs
use thiserror::Error;

/// Failure reported by a ledger collaborator: a peer, an orderer or the
/// channel object itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("peer {peer} unreachable: {cause}")]
    Unreachable { peer: String, cause: String },

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("channel {0} not found")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Configuration(String),

    #[error("proposal to {peer} failed: {cause}")]
    ProposalTransport { peer: String, cause: String },

    #[error("proposal rejected with status {status}: {message}")]
    ProposalApplication { status: u16, message: String },

    #[error("REQUEST_TIMEOUT:{peer}")]
    CommitTimeout { peer: String },

    #[error("The transaction was invalid on {peer}, code:{code}")]
    CommitInvalid { peer: String, code: String },

    #[error("commit listener on {peer} failed: {cause}")]
    CommitListener { peer: String, cause: String },

    #[error("Failed to order the transaction. Error code: {0}")]
    OrderSubmission(String),

    #[error("{0}")]
    Channel(#[from] ChannelError),

    #[error("Other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_failure_message_carries_code() {
        let err = GatewayError::OrderSubmission("BAD_REQUEST".to_string());
        assert_eq!(err.to_string(), "Failed to order the transaction. Error code: BAD_REQUEST");
    }

    #[test]
    fn channel_error_converts_transparently() {
        let err: GatewayError = ChannelError::NotFound("mychannel".to_string()).into();
        assert_eq!(err.to_string(), "channel mychannel not found");
    }
}
