use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::utils::PeerName;

/// Status a peer reports for a successfully simulated proposal.
pub const STATUS_ENDORSED: u16 = 200;

/// Chaincode section of a peer's proposal response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeResponse {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "hex::serde")]
    pub payload: Vec<u8>,
}

/// Endorser identity and its signature over the proposal response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    #[serde(with = "hex::serde")]
    pub endorser: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

/// One entry of a proposal batch as produced by the ledger client,
/// before any classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawProposalResponse {
    /// The peer could not be reached or the chaincode raised an error.
    /// `message` is the error text, which may embed a `{"status","msg"}` object.
    Error { peer: PeerName, message: String },

    /// A regular proposal response.
    Response {
        peer: PeerName,
        #[serde(default)]
        response: Option<ChaincodeResponse>,
        #[serde(default)]
        endorsement: Option<Endorsement>,
        #[serde(default, with = "hex::serde")]
        write_set: Vec<u8>,
    },
}

impl RawProposalResponse {
    pub fn peer(&self) -> &PeerName {
        match self {
            RawProposalResponse::Error { peer, .. } => peer,
            RawProposalResponse::Response { peer, .. } => peer,
        }
    }
}

/// Application-level rejection as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub status: u16,
    pub msg: String,
}

/// A response from a peer that simulated the proposal and signed the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsedResponse {
    pub peer: PeerName,
    pub status: u16,
    pub message: String,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    pub endorsement: Endorsement,
    #[serde(with = "hex::serde")]
    pub write_set: Vec<u8>,
}

/// A classified proposal response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalResponse {
    Endorsed(EndorsedResponse),
    ApplicationError { peer: PeerName, detail: ErrorDetail },
    TransportError { peer: PeerName, cause: String },
}

impl ProposalResponse {
    pub fn peer(&self) -> &PeerName {
        match self {
            ProposalResponse::Endorsed(r) => &r.peer,
            ProposalResponse::ApplicationError { peer, .. } => peer,
            ProposalResponse::TransportError { peer, .. } => peer,
        }
    }

    pub fn is_endorsed(&self) -> bool {
        matches!(self, ProposalResponse::Endorsed(_))
    }

    pub fn as_endorsed(&self) -> Option<&EndorsedResponse> {
        match self {
            ProposalResponse::Endorsed(r) => Some(r),
            _ => None,
        }
    }

    /// The failure this entry represents, `None` for endorsements.
    pub fn to_error(&self) -> Option<GatewayError> {
        match self {
            ProposalResponse::Endorsed(_) => None,
            ProposalResponse::ApplicationError { detail, .. } => Some(GatewayError::ProposalApplication {
                status: detail.status,
                message: detail.msg.clone(),
            }),
            ProposalResponse::TransportError { peer, cause } => Some(GatewayError::ProposalTransport {
                peer: peer.to_string(),
                cause: cause.clone(),
            }),
        }
    }
}
