//! Gateway metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported from here; the embedding process installs whatever
//! recorder it wants. Durations are in seconds.

use std::time::{Duration, Instant};

pub const REQUEST_COUNT: &str = "gateway_request_count";
pub const ERROR_REQUEST_COUNT: &str = "gateway_error_request_count";
pub const SEND_PROPOSAL_DURATION: &str = "gateway_send_proposal_duration";
pub const SEND_TRANSACTION_DURATION: &str = "gateway_send_transaction_duration";
pub const SEND_TRANSACTION_TOTAL_DURATION: &str = "gateway_send_transaction_total_duration";

/// Labels shared by every per-flow series.
#[derive(Debug, Clone)]
pub struct FlowLabels {
    pub channel: String,
    pub chaincode: String,
    pub function: String,
}

impl FlowLabels {
    pub fn new(channel: &str, chaincode: &str, function: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chaincode: chaincode.to_string(),
            function: function.to_string(),
        }
    }
}

pub fn record_request() {
    metrics::counter!(REQUEST_COUNT).increment(1);
}

pub fn record_error() {
    metrics::counter!(ERROR_REQUEST_COUNT).increment(1);
}

pub fn record_duration(name: &'static str, labels: &FlowLabels, elapsed: Duration) {
    metrics::histogram!(
        name,
        "channel" => labels.channel.clone(),
        "chaincode" => labels.chaincode.clone(),
        "function" => labels.function.clone()
    )
    .record(elapsed.as_secs_f64());
}

/// Records a histogram sample for the time between `start` and `finish`.
pub struct FlowTimer {
    name: &'static str,
    started: Instant,
}

impl FlowTimer {
    pub fn start(name: &'static str) -> Self {
        Self { name, started: Instant::now() }
    }

    pub fn finish(self, labels: &FlowLabels) -> Duration {
        let elapsed = self.started.elapsed();
        record_duration(self.name, labels, elapsed);
        elapsed
    }
}
