use serde_json::Value;

use atlas_common::env::envelope::{STATUS_UNCONFIRMED, SUCCESS_MESSAGE};
use atlas_common::env::{MessageDetail, PeerCommit, ResponseEnvelope};
use atlas_common::GatewayError;

use crate::coordinator::RequestOutcome;
use crate::endorsement::EndorsementFailure;

/// Decodes a chaincode payload: JSON when it parses, the UTF-8 text otherwise.
pub fn decode_payload(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned()))
}

fn diagnostics(commits: &[PeerCommit]) -> Vec<String> {
    commits
        .iter()
        .filter_map(PeerCommit::diagnostic)
        .map(|e| e.to_string())
        .collect()
}

/// Envelope for an endorsement round that did not reach all-good.
pub fn endorsement_failure(failure: &EndorsementFailure) -> ResponseEnvelope {
    match failure {
        EndorsementFailure::Rejected(errors) => match errors.first() {
            Some(first) => ResponseEnvelope::new(
                first.status,
                Value::String(String::new()),
                first.msg.clone(),
                MessageDetail::Errors(errors.clone()),
            ),
            None => ResponseEnvelope::unconfirmed("endorsement rejected without errors"),
        },
        EndorsementFailure::Unconfirmed(cause) => ResponseEnvelope::unconfirmed(cause.clone()),
    }
}

/// Maps a terminal coordinator outcome to the caller-facing envelope.
pub fn aggregate(outcome: &RequestOutcome) -> ResponseEnvelope {
    match outcome {
        RequestOutcome::Committed { response, commits } => ResponseEnvelope::new(
            response.status,
            decode_payload(&response.payload),
            SUCCESS_MESSAGE,
            MessageDetail::Text(SUCCESS_MESSAGE.to_string()),
        )
        .with_diagnostics(diagnostics(commits)),
        RequestOutcome::EndorsementFailed(failure) => endorsement_failure(failure),
        RequestOutcome::OrderFailed { code, commits } => {
            let message = GatewayError::OrderSubmission(code.clone()).to_string();
            ResponseEnvelope::new(
                STATUS_UNCONFIRMED,
                Value::String(String::new()),
                message.clone(),
                MessageDetail::Text(message),
            )
            .with_diagnostics(diagnostics(commits))
        }
        RequestOutcome::Aborted(cause) => ResponseEnvelope::unconfirmed(cause.clone()),
    }
}
