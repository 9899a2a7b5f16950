use std::time::Duration;

use tracing::{debug, info, warn};

use atlas_common::env::{Proposal, RawProposalResponse};
use atlas_common::transactions::TransactionRequest;
use atlas_common::utils::time::{as_millis, current_time};
use atlas_common::ChannelError;

use crate::logging::GATEWAY_TARGET;
use crate::metrics::{FlowLabels, FlowTimer, SEND_PROPOSAL_DURATION};
use crate::ports::{ChannelHandle, ProposalBatch};

pub const NO_RESPONSE: &str = "no response from peer";

/// Sends a proposal to the targeted peers, exactly once.
#[derive(Debug, Clone)]
pub struct EndorsementRequester {
    timeout: Duration,
}

impl EndorsementRequester {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns one raw entry per targeted peer plus the proposal as sent.
    ///
    /// A target the channel did not answer for gets an error entry so the
    /// validator always sees the full set. When the call as a whole times
    /// out every target gets the timeout as its error, and the returned
    /// proposal is a local stand-in that is never ordered. Only a channel
    /// error is returned as `Err`.
    pub async fn request(
        &self,
        channel: &dyn ChannelHandle,
        request: &TransactionRequest,
        labels: &FlowLabels,
    ) -> Result<ProposalBatch, ChannelError> {
        info!(
            target: GATEWAY_TARGET,
            "EVENT:PROPOSE tx={} channel={} chaincode={} fn={} targets={}",
            request.tx_id,
            request.channel,
            request.chaincode_id,
            request.function,
            request.targets.len()
        );

        let timer = FlowTimer::start(SEND_PROPOSAL_DURATION);
        let sent = tokio::time::timeout(self.timeout, channel.send_proposal(request, self.timeout)).await;
        let elapsed = timer.finish(labels);

        let (mut batch, unanswered) = match sent {
            Ok(result) => (result?, NO_RESPONSE.to_string()),
            Err(_) => {
                let cause = ChannelError::Timeout(as_millis(self.timeout)).to_string();
                warn!("proposal {} got no answer: {}", request.tx_id, cause);
                let batch = ProposalBatch {
                    responses: Vec::new(),
                    proposal: Proposal::new(request, "", current_time()),
                };
                (batch, cause)
            }
        };
        debug!(
            "proposal {} answered by {} peers in {:?}",
            request.tx_id,
            batch.responses.len(),
            elapsed
        );

        for target in &request.targets {
            if !batch.responses.iter().any(|r| r.peer() == target) {
                batch.responses.push(RawProposalResponse::Error {
                    peer: target.clone(),
                    message: unanswered.clone(),
                });
            }
        }
        Ok(batch)
    }
}
