use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use atlas_common::env::endorsement::STATUS_ENDORSED;
use atlas_common::env::{MessageDetail, ResponseEnvelope};
use atlas_common::transactions::{
    DeployAction, DeployRequest, Deployment, InstallProposal, InstallRequest, TransactionRequest,
};
use atlas_common::utils::PeerName;
use atlas_common::Result;

use crate::aggregator::{aggregate, endorsement_failure};
use crate::config::GatewayConfig;
use crate::context::{ConnectionPool, ContextKey};
use crate::coordinator::{CommitCoordinator, CoordinatorReport, FlowKind, FlowSpec};
use crate::endorsement::ResponseValidator;
use crate::logging::GATEWAY_TARGET;
use crate::metrics::{self, FlowLabels, FlowTimer, SEND_TRANSACTION_TOTAL_DURATION};
use crate::policy::resolve_policy;
use crate::ports::{ChannelHandle, ClientProvider, LedgerClient};

pub const INIT_FUNCTION: &str = "init";
pub const INSTALL_SUCCESS: &str = "Successfully sent install Proposal and received ProposalResponse";

/// Entry point for callers: invoke, instantiate, upgrade and install.
///
/// Every operation returns a [`ResponseEnvelope`]; none of them fail with
/// an error.
pub struct Gateway {
    pool: ConnectionPool,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(provider: Arc<dyn ClientProvider>, config: GatewayConfig) -> Self {
        Self { pool: ConnectionPool::new(provider), config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn key(&self, org: &str, user: Option<&str>) -> ContextKey {
        let org = if org.is_empty() { self.config.org_name.as_str() } else { org };
        let user = user
            .filter(|u| !u.is_empty())
            .or(self.config.user_name.as_deref());
        ContextKey::new(org, user)
    }

    fn channel_name<'a>(&'a self, channel: &'a str) -> &'a str {
        if channel.is_empty() {
            &self.config.channel_name
        } else {
            channel
        }
    }

    /// Submits a chaincode invocation and waits for it to be ordered.
    #[allow(clippy::too_many_arguments)]
    pub async fn invoke(
        &self,
        peers: &[String],
        channel: &str,
        chaincode: &str,
        function: &str,
        args: &[String],
        org: &str,
        user: &str,
    ) -> ResponseEnvelope {
        let channel = self.channel_name(channel);
        let labels = FlowLabels::new(channel, chaincode, function);
        let targets: Vec<PeerName> = peers.iter().map(|p| PeerName::from(p.as_str())).collect();
        let chaincode_id = chaincode.to_string();
        let function = function.to_string();
        let args = args.to_vec();

        let key = self.key(org, Some(user));
        self.run_flow(FlowKind::Invoke, key, channel, labels, move |client, channel| {
            Ok(TransactionRequest {
                targets,
                channel: channel.name().to_string(),
                chaincode_id,
                function,
                args,
                tx_id: client.new_transaction_id(false),
                deployment: None,
            })
        })
        .await
    }

    pub async fn instantiate(&self, org: &str, channel: &str, request: DeployRequest) -> ResponseEnvelope {
        self.deploy(DeployAction::Instantiate, org, channel, request).await
    }

    pub async fn upgrade(&self, org: &str, channel: &str, request: DeployRequest) -> ResponseEnvelope {
        self.deploy(DeployAction::Upgrade, org, channel, request).await
    }

    async fn deploy(&self, action: DeployAction, org: &str, channel: &str, request: DeployRequest) -> ResponseEnvelope {
        let kind = match action {
            DeployAction::Instantiate => FlowKind::Instantiate,
            DeployAction::Upgrade => FlowKind::Upgrade,
        };
        let channel = self.channel_name(channel);
        let labels = FlowLabels::new(channel, &request.chaincode_id, kind.label());

        let key = self.key(org, None);
        self.run_flow(kind, key, channel, labels, move |client, channel| {
            let endorsement_policy = resolve_policy(request.endorsement_policy, channel)?;
            Ok(TransactionRequest {
                targets: client.peers_for_org(),
                channel: channel.name().to_string(),
                chaincode_id: request.chaincode_id,
                function: INIT_FUNCTION.to_string(),
                args: request.args,
                tx_id: client.new_transaction_id(true),
                deployment: Some(Deployment {
                    action,
                    version: request.version,
                    chaincode_type: request.chaincode_type,
                    endorsement_policy,
                }),
            })
        })
        .await
    }

    /// Sends an install proposal to every peer of the organization.
    /// Nothing is ordered.
    pub async fn install(&self, org: &str, request: InstallRequest) -> ResponseEnvelope {
        metrics::record_request();
        let key = self.key(org, None);
        match self.install_on_peers(&key, request).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("install for {} failed: {}", key.org, e);
                metrics::record_error();
                ResponseEnvelope::unconfirmed(e.to_string())
            }
        }
    }

    async fn install_on_peers(&self, key: &ContextKey, request: InstallRequest) -> Result<ResponseEnvelope> {
        let ctx = self.pool.context(key).await?;
        let client = ctx.client();
        let proposal = InstallProposal {
            targets: client.peers_for_org(),
            tx_id: client.new_transaction_id(true),
            request,
        };
        info!(
            target: GATEWAY_TARGET,
            "EVENT:INSTALL tx={} chaincode={} version={} targets={}",
            proposal.tx_id,
            proposal.request.chaincode_id,
            proposal.request.version,
            proposal.targets.len()
        );

        let raw = client.install_chaincode(&proposal).await?;
        let outcome = ResponseValidator::new(false).validate(raw);
        Ok(match outcome.failure() {
            Some(failure) => endorsement_failure(&failure),
            None => ResponseEnvelope::new(
                STATUS_ENDORSED,
                Value::String(String::new()),
                INSTALL_SUCCESS,
                MessageDetail::Text(INSTALL_SUCCESS.to_string()),
            ),
        })
    }

    /// Rebuilds the cached client for (org, user). Returns the new generation.
    pub async fn refresh(&self, org: &str, user: Option<&str>) -> Result<u64> {
        let key = self.key(org, user);
        let current = self.pool.context(&key).await?;
        let fresh = self.pool.refresh(&current).await?;
        Ok(fresh.generation())
    }

    /// Resolves the context and channel, builds the request and runs the
    /// coordinator. Resolution failures abort before anything is sent.
    pub async fn execute<F>(&self, kind: FlowKind, key: &ContextKey, channel: &str, build: F) -> Result<CoordinatorReport>
    where
        F: FnOnce(&dyn LedgerClient, &dyn ChannelHandle) -> Result<TransactionRequest> + Send,
    {
        let ctx = self.pool.context(key).await?;
        let channel = ctx.channel(channel)?;
        let request = build(ctx.client().as_ref(), channel.as_ref())?;

        let coordinator = CommitCoordinator::new(channel, FlowSpec::from_config(kind, &self.config));
        Ok(coordinator.run(request).await)
    }

    async fn run_flow<F>(
        &self,
        kind: FlowKind,
        key: ContextKey,
        channel: &str,
        labels: FlowLabels,
        build: F,
    ) -> ResponseEnvelope
    where
        F: FnOnce(&dyn LedgerClient, &dyn ChannelHandle) -> Result<TransactionRequest> + Send,
    {
        metrics::record_request();
        let timer = FlowTimer::start(SEND_TRANSACTION_TOTAL_DURATION);

        let envelope = match self.execute(kind, &key, channel, build).await {
            Ok(report) => aggregate(&report.outcome),
            Err(e) => {
                error!("{} on {} for {} failed: {}", kind.label(), channel, key.org, e);
                metrics::record_error();
                ResponseEnvelope::unconfirmed(e.to_string())
            }
        };

        timer.finish(&labels);
        envelope
    }
}
