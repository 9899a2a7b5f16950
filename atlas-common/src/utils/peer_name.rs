use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a ledger peer as it appears in the connection profile,
/// e.g. `peer0.org1.example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerName(pub String);

impl PeerName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerName {
    fn from(value: &str) -> Self {
        PeerName(value.to_string())
    }
}

impl From<String> for PeerName {
    fn from(value: String) -> Self {
        PeerName(value)
    }
}
