use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::hash::digest_parts;

/// Identifier of a single ledger transaction.
///
/// The value is the SHA-256 of a random nonce followed by the creator
/// identity, so two identifiers minted by the same client never collide.
/// `admin` marks identifiers minted with the organization's admin identity,
/// which deploy flows (instantiate, upgrade, install) require.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    value: String,
    #[serde(default)]
    admin: bool,
}

impl TransactionId {
    pub fn generate(creator: &str, admin: bool) -> Self {
        let nonce = Uuid::new_v4();
        let value = digest_parts(&[nonce.as_bytes().as_slice(), creator.as_bytes()]);
        Self { value, admin }
    }

    /// Wraps an identifier produced elsewhere, e.g. read back from a block event.
    pub fn from_raw(value: impl Into<String>, admin: bool) -> Self {
        Self { value: value.into(), admin }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
