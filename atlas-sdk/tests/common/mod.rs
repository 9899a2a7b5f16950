#![allow(dead_code)]

use atlas_sdk::in_memory::InMemoryNetwork;
use atlas_sdk::{Gateway, GatewayConfig};

pub const CHANNEL: &str = "mychannel";
pub const CHAINCODE: &str = "mycc";

pub const ORG1_PEER0: &str = "peer0.org1.example.com";
pub const ORG1_PEER1: &str = "peer1.org1.example.com";
pub const ORG2_PEER0: &str = "peer0.org2.example.com";

pub fn all_peers() -> Vec<String> {
    [ORG1_PEER0, ORG1_PEER1, ORG2_PEER0].iter().map(|p| p.to_string()).collect()
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn gateway(network: &InMemoryNetwork) -> Gateway {
    Gateway::new(network.provider(), GatewayConfig::default())
}

/// Same payload on every peer of the sample network.
pub fn set_payload(network: &InMemoryNetwork, payload: &str) {
    for name in [ORG1_PEER0, ORG1_PEER1, ORG2_PEER0] {
        network.peer(name).unwrap().set_payload(payload.as_bytes().to_vec());
    }
}
