//! The commit coordinator: endorse, then order while listening for commits.
//!
//! One coordinator drives invoke, instantiate and upgrade. The flows differ
//! only in how the proposal is built (see [`crate::gateway`]) and in the
//! timeouts carried by [`FlowSpec`].

pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use atlas_common::env::{CommitOutcome, EndorsedResponse, OrderRequest, PeerCommit};
use atlas_common::transactions::{TransactionId, TransactionRequest};
use atlas_common::{GatewayError, Result};

use crate::commit::CommitListenerSet;
use crate::config::GatewayConfig;
use crate::endorsement::{EndorsementFailure, EndorsementRequester, ResponseValidator};
use crate::logging::GATEWAY_TARGET;
use crate::metrics::{self, FlowLabels};
use crate::order;
use crate::ports::ChannelHandle;

pub use state::{CoordinatorState, StateTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Invoke,
    Instantiate,
    Upgrade,
}

impl FlowKind {
    pub fn label(self) -> &'static str {
        match self {
            FlowKind::Invoke => "invoke",
            FlowKind::Instantiate => "instantiate",
            FlowKind::Upgrade => "upgrade",
        }
    }

    /// Deploy flows sign with the organization's admin identity.
    pub fn requires_admin(self) -> bool {
        !matches!(self, FlowKind::Invoke)
    }

    pub fn commit_timeout(self, config: &GatewayConfig) -> Duration {
        let secs = match self {
            FlowKind::Invoke => config.invoke_commit_timeout_secs,
            FlowKind::Instantiate => config.instantiate_commit_timeout_secs,
            FlowKind::Upgrade => config.upgrade_commit_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn proposal_timeout(self, config: &GatewayConfig) -> Duration {
        match self {
            FlowKind::Invoke => config.invoke_proposal_timeout(),
            FlowKind::Instantiate | FlowKind::Upgrade => config.deploy_proposal_timeout(),
        }
    }
}

/// Per-flow parameters of a coordinator run.
#[derive(Debug, Clone)]
pub struct FlowSpec {
    pub kind: FlowKind,
    pub proposal_timeout: Duration,
    pub commit_timeout: Duration,
    pub compare_write_sets: bool,
}

impl FlowSpec {
    pub fn from_config(kind: FlowKind, config: &GatewayConfig) -> Self {
        Self {
            kind,
            proposal_timeout: kind.proposal_timeout(config),
            commit_timeout: kind.commit_timeout(config),
            compare_write_sets: config.compare_write_sets,
        }
    }
}

/// Terminal result of a coordinator run.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The orderer accepted the transaction. `response` is the first endorsement.
    Committed {
        response: EndorsedResponse,
        commits: Vec<PeerCommit>,
    },
    EndorsementFailed(EndorsementFailure),
    /// The orderer answered with a status other than SUCCESS.
    OrderFailed { code: String, commits: Vec<PeerCommit> },
    /// An error outside the endorsement and ordering outcomes, e.g. the
    /// proposal call itself failed.
    Aborted(String),
}

impl RequestOutcome {
    pub fn commits(&self) -> &[PeerCommit] {
        match self {
            RequestOutcome::Committed { commits, .. } | RequestOutcome::OrderFailed { commits, .. } => commits,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorReport {
    pub tx_id: TransactionId,
    pub outcome: RequestOutcome,
    pub states: Vec<CoordinatorState>,
}

impl CoordinatorReport {
    pub fn final_state(&self) -> CoordinatorState {
        self.states.last().copied().unwrap_or(CoordinatorState::Init)
    }
}

pub struct CommitCoordinator {
    channel: Arc<dyn ChannelHandle>,
    spec: FlowSpec,
    state: StateTracker,
}

impl CommitCoordinator {
    pub fn new(channel: Arc<dyn ChannelHandle>, spec: FlowSpec) -> Self {
        Self { channel, spec, state: StateTracker::default() }
    }

    /// Runs one request to a terminal state. Never fails: unexpected errors
    /// come back as [`RequestOutcome::Aborted`].
    pub async fn run(mut self, request: TransactionRequest) -> CoordinatorReport {
        let labels = FlowLabels::new(&request.channel, &request.chaincode_id, &request.function);

        let outcome = match self.drive(&request, &labels).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} {} aborted: {}", self.spec.kind.label(), request.tx_id, e);
                metrics::record_error();
                let failed = match self.state.current() {
                    CoordinatorState::Committing => CoordinatorState::FailedOrder,
                    _ => CoordinatorState::FailedEndorsement,
                };
                if let Err(e) = self.state.advance(failed) {
                    warn!("{}", e);
                }
                RequestOutcome::Aborted(e.to_string())
            }
        };

        info!(
            target: GATEWAY_TARGET,
            "EVENT:DONE tx={} flow={} state={}",
            request.tx_id,
            self.spec.kind.label(),
            self.state.current()
        );

        CoordinatorReport {
            tx_id: request.tx_id,
            outcome,
            states: self.state.history().to_vec(),
        }
    }

    async fn drive(&mut self, request: &TransactionRequest, labels: &FlowLabels) -> Result<RequestOutcome> {
        let channel = Arc::clone(&self.channel);
        self.state.advance(CoordinatorState::Endorsing)?;

        let batch = EndorsementRequester::new(self.spec.proposal_timeout)
            .request(channel.as_ref(), request, labels)
            .await?;
        let endorsement = ResponseValidator::new(self.spec.compare_write_sets).validate(batch.responses);

        if let Some(failure) = endorsement.failure() {
            self.state.advance(CoordinatorState::FailedEndorsement)?;
            return Ok(RequestOutcome::EndorsementFailed(failure));
        }

        let endorsed = endorsement.endorsed();
        let first = endorsed
            .first()
            .cloned()
            .ok_or_else(|| GatewayError::Other("endorsement passed without endorsed responses".to_string()))?;
        self.state.advance(CoordinatorState::Committing)?;

        // Every listener is registered before the order future exists.
        let listeners = CommitListenerSet::register_all(channel.as_ref(), &request.tx_id, self.spec.commit_timeout);
        let order_request = OrderRequest {
            tx_id: request.tx_id.clone(),
            proposal: batch.proposal,
            responses: endorsed,
        };
        let (commits, ordered) = futures::join!(
            listeners.settle(),
            order::submit(channel.as_ref(), order_request, labels)
        );

        let valid = commits.iter().filter(|c| c.outcome == CommitOutcome::Valid).count();
        for diagnostic in commits.iter().filter_map(PeerCommit::diagnostic) {
            warn!("{}", diagnostic);
        }
        info!(
            target: GATEWAY_TARGET,
            "EVENT:COMMIT tx={} listeners={} valid={}",
            request.tx_id,
            commits.len(),
            valid
        );

        let ordered = ordered?;
        if ordered.status.is_success() {
            self.state.advance(CoordinatorState::Committed)?;
            Ok(RequestOutcome::Committed { response: first, commits })
        } else {
            self.state.advance(CoordinatorState::FailedOrder)?;
            Ok(RequestOutcome::OrderFailed {
                code: ordered.status.code().to_string(),
                commits,
            })
        }
    }
}
