use tracing::{debug, info};

use atlas_common::env::{OrderRequest, OrderResult};
use atlas_common::ChannelError;

use crate::logging::GATEWAY_TARGET;
use crate::metrics::{FlowLabels, FlowTimer, SEND_TRANSACTION_DURATION};
use crate::ports::ChannelHandle;

/// Broadcasts the endorsed transaction to the ordering service.
///
/// A non-SUCCESS status is returned as `Ok`; only a failed call is `Err`.
pub async fn submit(
    channel: &dyn ChannelHandle,
    request: OrderRequest,
    labels: &FlowLabels,
) -> Result<OrderResult, ChannelError> {
    let tx_id = request.tx_id.clone();
    debug!("sending {} endorsements for {} to the orderer", request.responses.len(), tx_id);

    let timer = FlowTimer::start(SEND_TRANSACTION_DURATION);
    let result = channel.submit_to_orderer(request).await;
    timer.finish(labels);

    match &result {
        Ok(r) => info!(target: GATEWAY_TARGET, "EVENT:ORDER tx={} status={}", tx_id, r.status),
        Err(e) => info!(target: GATEWAY_TARGET, "EVENT:ORDER tx={} error={}", tx_id, e),
    }
    result
}
