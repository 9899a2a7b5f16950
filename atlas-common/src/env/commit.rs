use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::utils::PeerName;

/// Validation code peers attach to a transaction that made it into the ledger.
pub const VALID_CODE: &str = "VALID";

/// Block event delivered to a commit listener for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub tx_id: String,
    pub code: String,
    #[serde(default)]
    pub block_number: u64,
}

impl CommitEvent {
    pub fn is_valid(&self) -> bool {
        self.code == VALID_CODE
    }
}

/// How a single peer's commit listener resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    Valid,
    Invalid(String),
    TimedOut,
    ListenerError(String),
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitOutcome::Valid => write!(f, "VALID"),
            CommitOutcome::Invalid(code) => write!(f, "INVALID({})", code),
            CommitOutcome::TimedOut => write!(f, "TIMED_OUT"),
            CommitOutcome::ListenerError(cause) => write!(f, "LISTENER_ERROR({})", cause),
        }
    }
}

/// Commit outcome paired with the event peer that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerCommit {
    pub peer: PeerName,
    pub address: String,
    pub outcome: CommitOutcome,
}

impl PeerCommit {
    /// Diagnostic error for anything other than a valid commit.
    pub fn diagnostic(&self) -> Option<GatewayError> {
        match &self.outcome {
            CommitOutcome::Valid => None,
            CommitOutcome::Invalid(code) => Some(GatewayError::CommitInvalid {
                peer: self.address.clone(),
                code: code.clone(),
            }),
            CommitOutcome::TimedOut => Some(GatewayError::CommitTimeout {
                peer: self.address.clone(),
            }),
            CommitOutcome::ListenerError(cause) => Some(GatewayError::CommitListener {
                peer: self.address.clone(),
                cause: cause.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(outcome: CommitOutcome) -> PeerCommit {
        PeerCommit {
            peer: "peer0.org1".into(),
            address: "localhost:7051".to_string(),
            outcome,
        }
    }

    #[test]
    fn valid_commit_has_no_diagnostic() {
        assert!(commit(CommitOutcome::Valid).diagnostic().is_none());
    }

    #[test]
    fn diagnostics_name_the_peer_address() {
        let timeout = commit(CommitOutcome::TimedOut).diagnostic().unwrap();
        assert_eq!(timeout.to_string(), "REQUEST_TIMEOUT:localhost:7051");

        let invalid = commit(CommitOutcome::Invalid("MVCC_READ_CONFLICT".into())).diagnostic().unwrap();
        assert_eq!(
            invalid.to_string(),
            "The transaction was invalid on localhost:7051, code:MVCC_READ_CONFLICT"
        );
    }
}
