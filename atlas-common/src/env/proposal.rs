use serde::{Deserialize, Serialize};

use crate::crypto::hash::digest;
use crate::transactions::{TransactionId, TransactionRequest};

/// The signed proposal a channel built from a [`TransactionRequest`].
///
/// Returned alongside the peer responses so it can be forwarded to the
/// orderer together with the endorsements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub tx_id: TransactionId,
    pub channel: String,
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,

    /// MSP id of the identity that created the proposal.
    pub creator: String,

    /// Header timestamp, seconds since the epoch.
    #[serde(default)]
    pub timestamp: u64,

    /// Hash over the signing view, see [`signing_bytes`].
    #[serde(default)]
    pub hash: String,
}

impl Proposal {
    pub fn new(request: &TransactionRequest, creator: &str, timestamp: u64) -> Self {
        let mut proposal = Self {
            tx_id: request.tx_id.clone(),
            channel: request.channel.clone(),
            chaincode_id: request.chaincode_id.clone(),
            function: request.function.clone(),
            args: request.args.clone(),
            creator: creator.to_string(),
            timestamp,
            hash: String::new(),
        };
        proposal.hash = digest(&signing_bytes(&proposal));
        proposal
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Serialize)]
struct ProposalSignView<'a> {
    tx_id: &'a str,
    channel: &'a str,
    chaincode_id: &'a str,
    function: &'a str,
    args: &'a [String],
    creator: &'a str,
    timestamp: u64,
}

pub fn signing_bytes(p: &Proposal) -> Vec<u8> {
    bincode::serialize(&ProposalSignView {
        tx_id: p.tx_id.as_str(),
        channel: &p.channel,
        chaincode_id: &p.chaincode_id,
        function: &p.function,
        args: &p.args,
        creator: &p.creator,
        timestamp: p.timestamp,
    })
    .expect("serialize sign view")
}

#[derive(Serialize)]
struct EndorsementSignView<'a> {
    proposal_hash: &'a str,
    payload: &'a [u8],
    write_set: &'a [u8],
}

/// Bytes an endorsing peer signs: the proposal hash, the chaincode payload
/// and the simulated write set.
pub fn endorsement_signing_bytes(proposal_hash: &str, payload: &[u8], write_set: &[u8]) -> Vec<u8> {
    bincode::serialize(&EndorsementSignView {
        proposal_hash,
        payload,
        write_set,
    })
    .expect("serialize endorsement view")
}
