use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::endorsement::ErrorDetail;

/// Status used when the outcome could not be confirmed end to end.
pub const STATUS_UNCONFIRMED: u16 = 202;
pub const SUCCESS_MESSAGE: &str = "Success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeResult {
    #[serde(rename = "Status")]
    pub status: u16,
    #[serde(rename = "Payload")]
    pub payload: Value,
}

/// Human readable detail, or the list of application errors peers returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageDetail {
    Text(String),
    Errors(Vec<ErrorDetail>),
}

/// Result of every public gateway flow.
///
/// Serialized as `{"Result":{"Status","Payload"},"Message","MessageDetail"}`.
/// Commit diagnostics travel in `Diagnostics`, which is left out when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "Result")]
    pub result: EnvelopeResult,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "MessageDetail")]
    pub detail: MessageDetail,
    #[serde(rename = "Diagnostics", default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl ResponseEnvelope {
    pub fn new(status: u16, payload: Value, message: impl Into<String>, detail: MessageDetail) -> Self {
        Self {
            result: EnvelopeResult { status, payload },
            message: message.into(),
            detail,
            diagnostics: Vec::new(),
        }
    }

    /// 202 envelope whose message and detail both carry `cause`.
    pub fn unconfirmed(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        Self::new(
            STATUS_UNCONFIRMED,
            Value::String(String::new()),
            cause.clone(),
            MessageDetail::Text(cause),
        )
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn status(&self) -> u16 {
        self.result.status
    }

    pub fn payload(&self) -> &Value {
        &self.result.payload
    }
}
