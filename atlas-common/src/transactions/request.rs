use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::TransactionId;
use crate::env::policy::EndorsementPolicy;
use crate::utils::PeerName;

/// Language runtime of a chaincode package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaincodeType {
    #[default]
    Golang,
    Node,
    Java,
}

impl fmt::Display for ChaincodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChaincodeType::Golang => "golang",
            ChaincodeType::Node => "node",
            ChaincodeType::Java => "java",
        };
        f.write_str(name)
    }
}

/// Lifecycle step a deployment proposal performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployAction {
    Instantiate,
    Upgrade,
}

/// Chaincode version, runtime and policy attached to an instantiate or
/// upgrade proposal. The policy is always resolved by the time a proposal
/// is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub action: DeployAction,
    pub version: String,
    pub chaincode_type: ChaincodeType,
    pub endorsement_policy: EndorsementPolicy,
}

/// A fully specified proposal ready to be sent for endorsement.
///
/// Built once per flow and never mutated afterwards.
///
/// # Fields
///
/// - `targets`: peers asked to endorse; empty means the channel's default set.
/// - `channel`: channel the chaincode is deployed on.
/// - `chaincode_id`: name of the chaincode.
/// - `function` / `args`: the call, `init` for deployments.
/// - `tx_id`: identifier minted by the ledger client for this request.
/// - `deployment`: present only for instantiate and upgrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub targets: Vec<PeerName>,
    pub channel: String,
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TransactionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
}

/// Caller input for instantiate and upgrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub chaincode_id: String,
    pub version: String,
    #[serde(default)]
    pub chaincode_type: ChaincodeType,
    #[serde(default)]
    pub args: Vec<String>,
    /// When absent every organization with a peer on the channel must sign.
    #[serde(default)]
    pub endorsement_policy: Option<EndorsementPolicy>,
}

/// Caller input for installing a chaincode package on an organization's peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub chaincode_id: String,
    pub chaincode_path: String,
    pub version: String,
    #[serde(default)]
    pub chaincode_type: ChaincodeType,
    #[serde(default)]
    pub metadata_path: Option<String>,
}

/// Install proposal as handed to the ledger client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallProposal {
    pub targets: Vec<PeerName>,
    pub request: InstallRequest,
    pub tx_id: TransactionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_request_defaults() {
        let req: DeployRequest =
            serde_json::from_str(r#"{"chaincode_id":"mycc","version":"1.0"}"#).unwrap();
        assert_eq!(req.chaincode_type, ChaincodeType::Golang);
        assert!(req.args.is_empty());
        assert!(req.endorsement_policy.is_none());
    }

    #[test]
    fn chaincode_type_display_matches_wire_name() {
        assert_eq!(ChaincodeType::Node.to_string(), "node");
        assert_eq!(serde_json::to_string(&ChaincodeType::Java).unwrap(), "\"java\"");
    }
}
