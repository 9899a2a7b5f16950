use std::fmt;

use serde::{Deserialize, Serialize};

use super::endorsement::EndorsedResponse;
use super::proposal::Proposal;
use crate::transactions::TransactionId;

/// Status text an orderer returns for an accepted broadcast.
pub const ORDER_SUCCESS: &str = "SUCCESS";

/// Endorsed transaction handed to the ordering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub tx_id: TransactionId,
    pub proposal: Proposal,
    pub responses: Vec<EndorsedResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Success,
    Failure(String),
}

impl OrderStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OrderStatus::Success)
    }

    pub fn code(&self) -> &str {
        match self {
            OrderStatus::Success => ORDER_SUCCESS,
            OrderStatus::Failure(code) => code,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(code: String) -> Self {
        if code == ORDER_SUCCESS {
            OrderStatus::Success
        } else {
            OrderStatus::Failure(code)
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Orderer acknowledgement for a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub status: OrderStatus,
    #[serde(default)]
    pub info: String,
}

impl OrderResult {
    pub fn success() -> Self {
        Self { status: OrderStatus::Success, info: String::new() }
    }

    pub fn failure(code: impl Into<String>) -> Self {
        Self { status: OrderStatus::Failure(code.into()), info: String::new() }
    }
}
