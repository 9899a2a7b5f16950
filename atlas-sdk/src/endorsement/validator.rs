use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::{error, info, warn};

use atlas_common::crypto::hash::digest;
use atlas_common::env::endorsement::STATUS_ENDORSED;
use atlas_common::env::envelope::STATUS_UNCONFIRMED;
use atlas_common::env::{EndorsedResponse, ErrorDetail, ProposalResponse, RawProposalResponse};

use crate::logging::GATEWAY_TARGET;
use crate::metrics;

pub const NO_RESPONSES: &str = "no proposal responses received";

/// Chaincode errors carry a JSON object in the error message.
#[derive(Deserialize)]
struct EmbeddedError {
    status: u16,
    msg: String,
}

/// Classifies one raw peer response.
///
/// Error entries whose message parses as `{"status","msg"}` are application
/// rejections; any other error entry is a transport failure. A response
/// with status 200 and an endorsement is endorsed. Everything else is an
/// application error with an unknown reason.
pub fn classify(raw: RawProposalResponse) -> ProposalResponse {
    match raw {
        RawProposalResponse::Error { peer, message } => match serde_json::from_str::<EmbeddedError>(&message) {
            Ok(embedded) => ProposalResponse::ApplicationError {
                peer,
                detail: ErrorDetail { status: embedded.status, msg: embedded.msg },
            },
            Err(_) => ProposalResponse::TransportError { peer, cause: message },
        },
        RawProposalResponse::Response {
            peer,
            response: Some(response),
            endorsement: Some(endorsement),
            write_set,
        } if response.status == STATUS_ENDORSED => ProposalResponse::Endorsed(EndorsedResponse {
            peer,
            status: response.status,
            message: response.message,
            payload: response.payload,
            endorsement,
            write_set,
        }),
        other => {
            let status = match &other {
                RawProposalResponse::Response { response: Some(r), .. } if r.status != STATUS_ENDORSED => r.status,
                _ => STATUS_UNCONFIRMED,
            };
            let raw = serde_json::to_string(&other).unwrap_or_else(|_| format!("{:?}", other));
            ProposalResponse::ApplicationError {
                peer: other.peer().clone(),
                detail: ErrorDetail {
                    status,
                    msg: format!("proposal failed for an unknown reason {}", raw),
                },
            }
        }
    }
}

/// Why an endorsement round did not reach all-good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndorsementFailure {
    /// At least one peer rejected the proposal; the full list in peer order.
    Rejected(Vec<ErrorDetail>),
    /// Only transport-level failures, or nothing came back at all.
    Unconfirmed(String),
}

/// Aggregate of one endorsement round.
#[derive(Debug, Clone)]
pub struct EndorsementOutcome {
    responses: Vec<ProposalResponse>,
    write_sets_consistent: bool,
}

impl EndorsementOutcome {
    /// True iff there is at least one response and every response is endorsed.
    pub fn all_good(&self) -> bool {
        !self.responses.is_empty() && self.responses.iter().all(ProposalResponse::is_endorsed)
    }

    pub fn responses(&self) -> &[ProposalResponse] {
        &self.responses
    }

    pub fn application_errors(&self) -> Vec<ErrorDetail> {
        self.responses
            .iter()
            .filter_map(|r| match r {
                ProposalResponse::ApplicationError { detail, .. } => Some(detail.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn first_application_error(&self) -> Option<&ErrorDetail> {
        self.responses.iter().find_map(|r| match r {
            ProposalResponse::ApplicationError { detail, .. } => Some(detail),
            _ => None,
        })
    }

    pub fn endorsed(&self) -> Vec<EndorsedResponse> {
        self.responses.iter().filter_map(|r| r.as_endorsed().cloned()).collect()
    }

    pub fn write_sets_consistent(&self) -> bool {
        self.write_sets_consistent
    }

    pub fn failure(&self) -> Option<EndorsementFailure> {
        if self.all_good() {
            return None;
        }
        let rejected = self.application_errors();
        if !rejected.is_empty() {
            return Some(EndorsementFailure::Rejected(rejected));
        }
        let cause = self
            .responses
            .iter()
            .find_map(|r| match r {
                ProposalResponse::TransportError { cause, .. } => {
                    Some(format!("proposal resulted in an error :: {}", cause))
                }
                _ => None,
            })
            .unwrap_or_else(|| NO_RESPONSES.to_string());
        Some(EndorsementFailure::Unconfirmed(cause))
    }
}

/// Turns raw peer responses into an [`EndorsementOutcome`].
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    compare_write_sets: bool,
}

impl ResponseValidator {
    pub fn new(compare_write_sets: bool) -> Self {
        Self { compare_write_sets }
    }

    pub fn validate(&self, raw: Vec<RawProposalResponse>) -> EndorsementOutcome {
        let responses: Vec<ProposalResponse> = raw.into_iter().map(classify).collect();

        for response in &responses {
            match response {
                ProposalResponse::Endorsed(r) => {
                    info!("proposal endorsed by {} with status {}", r.peer, r.status);
                }
                other => {
                    metrics::record_error();
                    if let Some(err) = other.to_error() {
                        error!("proposal not endorsed by {}: {}", other.peer(), err);
                    }
                }
            }
        }

        let endorsed: Vec<&EndorsedResponse> = responses.iter().filter_map(ProposalResponse::as_endorsed).collect();
        let endorsed_count = endorsed.len();
        let write_sets_consistent = !self.compare_write_sets || compare_write_sets(&endorsed);

        let outcome = EndorsementOutcome { responses, write_sets_consistent };
        info!(
            target: GATEWAY_TARGET,
            "EVENT:ENDORSE responses={} endorsed={} all_good={}",
            outcome.responses.len(),
            endorsed_count,
            outcome.all_good()
        );
        outcome
    }
}

/// Logs a warning when endorsers simulated different write sets.
/// Returns whether all write sets matched.
pub fn compare_write_sets(endorsed: &[&EndorsedResponse]) -> bool {
    let digests: BTreeSet<String> = endorsed.iter().map(|r| digest(&r.write_set)).collect();
    if digests.len() > 1 {
        let peers: Vec<String> = endorsed.iter().map(|r| r.peer.to_string()).collect();
        warn!(
            "endorsers {:?} returned {} distinct write sets; the orderer may invalidate this transaction",
            peers,
            digests.len()
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::env::{ChaincodeResponse, Endorsement};

    fn endorsed(peer: &str, write_set: &[u8]) -> RawProposalResponse {
        RawProposalResponse::Response {
            peer: peer.into(),
            response: Some(ChaincodeResponse {
                status: 200,
                message: String::new(),
                payload: b"{\"ok\":true}".to_vec(),
            }),
            endorsement: Some(Endorsement { endorser: vec![1], signature: vec![2] }),
            write_set: write_set.to_vec(),
        }
    }

    #[test]
    fn embedded_json_error_is_application_error() {
        let raw = RawProposalResponse::Error {
            peer: "peer0".into(),
            message: r#"{"status":500,"msg":"insufficient funds"}"#.to_string(),
        };
        assert_eq!(
            classify(raw),
            ProposalResponse::ApplicationError {
                peer: "peer0".into(),
                detail: ErrorDetail { status: 500, msg: "insufficient funds".into() },
            }
        );
    }

    #[test]
    fn plain_error_is_transport_error() {
        let raw = RawProposalResponse::Error {
            peer: "peer0".into(),
            message: "14 UNAVAILABLE: connect ECONNREFUSED".to_string(),
        };
        assert!(matches!(classify(raw), ProposalResponse::TransportError { .. }));
    }

    #[test]
    fn non_200_response_is_unknown_reason() {
        let raw = RawProposalResponse::Response {
            peer: "peer0".into(),
            response: Some(ChaincodeResponse { status: 403, message: "denied".into(), payload: vec![] }),
            endorsement: None,
            write_set: vec![],
        };
        match classify(raw) {
            ProposalResponse::ApplicationError { detail, .. } => {
                assert_eq!(detail.status, 403);
                assert!(detail.msg.starts_with("proposal failed for an unknown reason"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn status_200_without_endorsement_is_not_endorsed() {
        let raw = RawProposalResponse::Response {
            peer: "peer0".into(),
            response: Some(ChaincodeResponse { status: 200, message: String::new(), payload: vec![] }),
            endorsement: None,
            write_set: vec![],
        };
        match classify(raw) {
            ProposalResponse::ApplicationError { detail, .. } => assert_eq!(detail.status, STATUS_UNCONFIRMED),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn verdict_does_not_depend_on_response_order() {
        let validator = ResponseValidator::new(false);
        let healthy: Vec<RawProposalResponse> =
            (0..4).map(|i| endorsed(&format!("p{}", i), b"ws")).collect();

        let mut reversed = healthy.clone();
        reversed.reverse();
        assert!(validator.validate(healthy.clone()).all_good());
        assert!(validator.validate(reversed).all_good());

        let failing = vec![
            RawProposalResponse::Error { peer: "bad".into(), message: "14 UNAVAILABLE".into() },
            RawProposalResponse::Error { peer: "bad".into(), message: r#"{"status":500,"msg":"boom"}"#.into() },
            RawProposalResponse::Response {
                peer: "bad".into(),
                response: Some(ChaincodeResponse { status: 403, message: "denied".into(), payload: vec![] }),
                endorsement: None,
                write_set: vec![],
            },
        ];

        for bad in failing {
            let mut verdicts = Vec::new();
            for position in 0..=healthy.len() {
                let mut batch = healthy.clone();
                batch.insert(position, bad.clone());
                let outcome = validator.validate(batch);
                assert!(!outcome.all_good(), "{:?} at {} passed", bad, position);
                verdicts.push(outcome.failure());
            }
            assert!(verdicts[0].is_some());
            assert!(verdicts.iter().all(|v| *v == verdicts[0]), "{:?}: {:?}", bad, verdicts);
        }
    }

    #[test]
    fn all_good_requires_every_peer() {
        let validator = ResponseValidator::new(true);
        let outcome = validator.validate(vec![endorsed("p0", b"ws"), endorsed("p1", b"ws")]);
        assert!(outcome.all_good());
        assert!(outcome.failure().is_none());
        assert_eq!(outcome.endorsed().len(), 2);

        let outcome = validator.validate(vec![
            endorsed("p0", b"ws"),
            RawProposalResponse::Error { peer: "p1".into(), message: "timeout".into() },
        ]);
        assert!(!outcome.all_good());
        assert_eq!(
            outcome.failure(),
            Some(EndorsementFailure::Unconfirmed("proposal resulted in an error :: timeout".into()))
        );
    }

    #[test]
    fn application_errors_take_precedence_over_transport() {
        let outcome = ResponseValidator::new(false).validate(vec![
            RawProposalResponse::Error { peer: "p0".into(), message: "unreachable".into() },
            RawProposalResponse::Error { peer: "p1".into(), message: r#"{"status":404,"msg":"a"}"#.into() },
            RawProposalResponse::Error { peer: "p2".into(), message: r#"{"status":500,"msg":"b"}"#.into() },
        ]);
        assert_eq!(outcome.first_application_error().unwrap().status, 404);
        assert_eq!(
            outcome.failure(),
            Some(EndorsementFailure::Rejected(vec![
                ErrorDetail { status: 404, msg: "a".into() },
                ErrorDetail { status: 500, msg: "b".into() },
            ]))
        );
    }

    #[test]
    fn empty_batch_is_never_all_good() {
        let outcome = ResponseValidator::new(true).validate(vec![]);
        assert!(!outcome.all_good());
        assert_eq!(outcome.failure(), Some(EndorsementFailure::Unconfirmed(NO_RESPONSES.into())));
    }

    #[test]
    fn write_set_mismatch_only_warns() {
        let outcome = ResponseValidator::new(true).validate(vec![endorsed("p0", b"a"), endorsed("p1", b"b")]);
        assert!(outcome.all_good());
        assert!(!outcome.write_sets_consistent());

        let unchecked = ResponseValidator::new(false).validate(vec![endorsed("p0", b"a"), endorsed("p1", b"b")]);
        assert!(unchecked.write_sets_consistent());
    }
}
