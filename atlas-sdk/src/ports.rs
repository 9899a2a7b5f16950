//! Seams between the gateway and the ledger SDK.
//!
//! The coordinator only talks to these traits. Production code plugs in a
//! real ledger client; tests and the simulator use [`crate::in_memory`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use atlas_common::env::{CommitEvent, OrderRequest, OrderResult, Proposal, RawProposalResponse};
use atlas_common::transactions::{InstallProposal, TransactionId, TransactionRequest};
use atlas_common::utils::PeerName;
use atlas_common::ChannelError;

/// Resolves the ledger client for an organization and user.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn client_for_org(&self, org: &str, user: Option<&str>) -> Result<Arc<dyn LedgerClient>, ChannelError>;
}

/// An authenticated ledger client bound to one organization.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn msp_id(&self) -> &str;

    fn new_transaction_id(&self, admin: bool) -> TransactionId;

    fn peers_for_org(&self) -> Vec<PeerName>;

    /// Channel from the connection profile, `None` if the profile does not define it.
    fn channel(&self, name: &str) -> Option<Arc<dyn ChannelHandle>>;

    async fn install_chaincode(&self, proposal: &InstallProposal) -> Result<Vec<RawProposalResponse>, ChannelError>;
}

/// Responses for one proposal plus the proposal itself, as sent.
#[derive(Debug, Clone)]
pub struct ProposalBatch {
    pub responses: Vec<RawProposalResponse>,
    pub proposal: Proposal,
}

/// A peer known to the channel and the MSP it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPeer {
    pub name: PeerName,
    pub msp_id: String,
}

#[async_trait]
pub trait ChannelHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn send_proposal(&self, request: &TransactionRequest, timeout: Duration) -> Result<ProposalBatch, ChannelError>;

    async fn submit_to_orderer(&self, request: OrderRequest) -> Result<OrderResult, ChannelError>;

    /// Event peers of the client's own organization.
    fn event_peers_for_org(&self) -> Vec<Arc<dyn EventPeer>>;

    fn peers(&self) -> Vec<ChannelPeer>;
}

/// Block event source on a single peer.
///
/// Registration is synchronous so a caller can be sure every listener is
/// in place before the transaction is submitted for ordering.
pub trait EventPeer: Send + Sync {
    fn name(&self) -> PeerName;

    fn address(&self) -> String;

    /// Registers a one-shot listener for `tx_id`. The listener is dropped by
    /// the peer once it fires.
    fn register_tx_listener(&self, tx_id: &TransactionId) -> Result<CommitSubscription, ChannelError>;

    fn unregister_tx_listener(&self, tx_id: &TransactionId);

    fn disconnect(&self);
}

pub type CommitNotifier = oneshot::Sender<Result<CommitEvent, String>>;

/// Receiving end of a transaction listener.
#[derive(Debug)]
pub struct CommitSubscription {
    events: oneshot::Receiver<Result<CommitEvent, String>>,
}

impl CommitSubscription {
    pub fn pair() -> (CommitNotifier, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { events: rx })
    }

    /// Waits for the event. A dropped notifier is reported as an error.
    pub async fn event(self) -> Result<CommitEvent, String> {
        match self.events.await {
            Ok(result) => result,
            Err(_) => Err("event source closed before the transaction was seen".to_string()),
        }
    }
}
