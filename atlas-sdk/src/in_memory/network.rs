use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use atlas_common::env::{OrderRequest, OrderResult, Proposal, RawProposalResponse};
use atlas_common::transactions::{InstallProposal, TransactionId, TransactionRequest};
use atlas_common::utils::time::current_time;
use atlas_common::utils::PeerName;
use atlas_common::ChannelError;

use super::peer::{verify_endorsement, InMemoryPeer};
use crate::ports::{ChannelHandle, ChannelPeer, ClientProvider, EventPeer, LedgerClient, ProposalBatch};

/// How the ordering service answers a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrdererBehavior {
    Accept,
    /// Answer with this non-SUCCESS status.
    Reject(String),
    /// Fail the broadcast call itself.
    Unavailable(String),
}

struct OrgState {
    msp_id: String,
    peers: Vec<Arc<InMemoryPeer>>,
}

struct ChannelState {
    name: String,
    peers: Vec<Arc<InMemoryPeer>>,
    orderer: Mutex<OrdererBehavior>,
    commit_delay: Mutex<Duration>,
    submissions: Mutex<Vec<OrderRequest>>,
    requests: Mutex<Vec<TransactionRequest>>,
    height: AtomicU64,
}

impl ChannelState {
    fn peer(&self, name: &PeerName) -> Option<&Arc<InMemoryPeer>> {
        self.peers.iter().find(|p| p.peer_name() == name)
    }
}

struct NetworkState {
    orgs: HashMap<String, OrgState>,
    channels: HashMap<String, Arc<ChannelState>>,
    client_builds: AtomicUsize,
}

#[derive(Default)]
pub struct InMemoryNetworkBuilder {
    orgs: Vec<(String, String)>,
    peers: Vec<(String, String)>,
    channels: Vec<String>,
}

impl InMemoryNetworkBuilder {
    pub fn org(mut self, name: &str, msp_id: &str) -> Self {
        self.orgs.push((name.to_string(), msp_id.to_string()));
        self
    }

    pub fn peer(mut self, org: &str, name: &str) -> Self {
        self.peers.push((org.to_string(), name.to_string()));
        self
    }

    /// Every peer joins every channel.
    pub fn channel(mut self, name: &str) -> Self {
        self.channels.push(name.to_string());
        self
    }

    pub fn build(self) -> InMemoryNetwork {
        let mut orgs: HashMap<String, OrgState> = self
            .orgs
            .into_iter()
            .map(|(name, msp_id)| (name, OrgState { msp_id, peers: Vec::new() }))
            .collect();

        let mut all_peers = Vec::new();
        for (org, name) in self.peers {
            match orgs.get_mut(&org) {
                Some(state) => {
                    let peer = Arc::new(InMemoryPeer::new(&name, &state.msp_id));
                    state.peers.push(Arc::clone(&peer));
                    all_peers.push(peer);
                }
                None => warn!("peer {} names unknown organization {}, skipped", name, org),
            }
        }

        let channels = self
            .channels
            .into_iter()
            .map(|name| {
                let state = ChannelState {
                    name: name.clone(),
                    peers: all_peers.clone(),
                    orderer: Mutex::new(OrdererBehavior::Accept),
                    commit_delay: Mutex::new(Duration::ZERO),
                    submissions: Mutex::new(Vec::new()),
                    requests: Mutex::new(Vec::new()),
                    height: AtomicU64::new(0),
                };
                (name, Arc::new(state))
            })
            .collect();

        InMemoryNetwork {
            state: Arc::new(NetworkState { orgs, channels, client_builds: AtomicUsize::new(0) }),
        }
    }
}

#[derive(Clone)]
pub struct InMemoryNetwork {
    state: Arc<NetworkState>,
}

impl InMemoryNetwork {
    pub fn builder() -> InMemoryNetworkBuilder {
        InMemoryNetworkBuilder::default()
    }

    /// Two organizations on `mychannel`: Org1 with two peers, Org2 with one.
    pub fn sample() -> Self {
        Self::builder()
            .org("Org1", "Org1MSP")
            .org("Org2", "Org2MSP")
            .peer("Org1", "peer0.org1.example.com")
            .peer("Org1", "peer1.org1.example.com")
            .peer("Org2", "peer0.org2.example.com")
            .channel("mychannel")
            .build()
    }

    pub fn provider(&self) -> Arc<dyn ClientProvider> {
        Arc::new(self.clone())
    }

    pub fn peer(&self, name: &str) -> Option<Arc<InMemoryPeer>> {
        self.state
            .orgs
            .values()
            .flat_map(|org| org.peers.iter())
            .find(|p| p.peer_name().as_str() == name)
            .cloned()
    }

    pub fn org_peers(&self, org: &str) -> Vec<Arc<InMemoryPeer>> {
        self.state.orgs.get(org).map(|o| o.peers.clone()).unwrap_or_default()
    }

    pub fn set_orderer_behavior(&self, channel: &str, behavior: OrdererBehavior) -> bool {
        match self.state.channels.get(channel) {
            Some(state) => {
                *state.orderer.lock().unwrap() = behavior;
                true
            }
            None => false,
        }
    }

    /// Delay between an accepted broadcast and block delivery to peers.
    pub fn set_commit_delay(&self, channel: &str, delay: Duration) -> bool {
        match self.state.channels.get(channel) {
            Some(state) => {
                *state.commit_delay.lock().unwrap() = delay;
                true
            }
            None => false,
        }
    }

    pub fn order_submissions(&self, channel: &str) -> Vec<OrderRequest> {
        self.state
            .channels
            .get(channel)
            .map(|s| s.submissions.lock().unwrap().clone())
            .unwrap_or_default()
    }

    /// Requests the channel received proposals for, in arrival order.
    pub fn proposal_requests(&self, channel: &str) -> Vec<TransactionRequest> {
        self.state
            .channels
            .get(channel)
            .map(|s| s.requests.lock().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn proposals_sent(&self, channel: &str) -> usize {
        self.proposal_requests(channel).len()
    }

    pub fn block_height(&self, channel: &str) -> u64 {
        self.state
            .channels
            .get(channel)
            .map(|s| s.height.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// How many ledger clients the provider has handed out.
    pub fn client_builds(&self) -> usize {
        self.state.client_builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientProvider for InMemoryNetwork {
    async fn client_for_org(&self, org: &str, user: Option<&str>) -> Result<Arc<dyn LedgerClient>, ChannelError> {
        let state = self
            .state
            .orgs
            .get(org)
            .ok_or_else(|| ChannelError::Rejected(format!("unknown organization {}", org)))?;

        self.state.client_builds.fetch_add(1, Ordering::SeqCst);
        debug!("building in-memory client for {} as {}", org, user.unwrap_or("admin"));
        Ok(Arc::new(InMemoryClient {
            org: org.to_string(),
            msp_id: state.msp_id.clone(),
            network: Arc::clone(&self.state),
        }))
    }
}

struct InMemoryClient {
    org: String,
    msp_id: String,
    network: Arc<NetworkState>,
}

impl InMemoryClient {
    fn org_peers(&self) -> &[Arc<InMemoryPeer>] {
        self.network
            .orgs
            .get(&self.org)
            .map(|o| o.peers.as_slice())
            .unwrap_or(&[])
    }
}

#[async_trait]
impl LedgerClient for InMemoryClient {
    fn msp_id(&self) -> &str {
        &self.msp_id
    }

    fn new_transaction_id(&self, admin: bool) -> TransactionId {
        TransactionId::generate(&self.msp_id, admin)
    }

    fn peers_for_org(&self) -> Vec<PeerName> {
        self.org_peers().iter().map(|p| p.peer_name().clone()).collect()
    }

    fn channel(&self, name: &str) -> Option<Arc<dyn ChannelHandle>> {
        let shared = self.network.channels.get(name)?;
        Some(Arc::new(InMemoryChannel {
            shared: Arc::clone(shared),
            msp_id: self.msp_id.clone(),
        }))
    }

    async fn install_chaincode(&self, proposal: &InstallProposal) -> Result<Vec<RawProposalResponse>, ChannelError> {
        if proposal.targets.is_empty() {
            return Err(ChannelError::Rejected("install proposal has no targets".to_string()));
        }

        let hash = atlas_common::crypto::hash::digest(proposal.tx_id.as_str().as_bytes());
        let responses = proposal
            .targets
            .iter()
            .map(|target| match self.org_peers().iter().find(|p| p.peer_name() == target) {
                Some(peer) => peer.endorse(&hash),
                None => RawProposalResponse::Error {
                    peer: target.clone(),
                    message: format!("peer {} is not part of {}", target, self.org),
                },
            })
            .collect();
        Ok(responses)
    }
}

/// A channel as seen by one organization's client.
struct InMemoryChannel {
    shared: Arc<ChannelState>,
    msp_id: String,
}

#[async_trait]
impl ChannelHandle for InMemoryChannel {
    fn name(&self) -> &str {
        &self.shared.name
    }

    async fn send_proposal(&self, request: &TransactionRequest, _timeout: Duration) -> Result<ProposalBatch, ChannelError> {
        let proposal = Proposal::new(request, &self.msp_id, current_time());
        self.shared.requests.lock().unwrap().push(request.clone());

        let targets: Vec<PeerName> = if request.targets.is_empty() {
            self.shared.peers.iter().map(|p| p.peer_name().clone()).collect()
        } else {
            request.targets.clone()
        };

        let responses = targets
            .into_iter()
            .map(|target| match self.shared.peer(&target) {
                Some(peer) => peer.endorse(&proposal.hash),
                None => RawProposalResponse::Error {
                    message: format!("peer {} is not joined to channel {}", target, self.shared.name),
                    peer: target,
                },
            })
            .collect();

        Ok(ProposalBatch { responses, proposal })
    }

    async fn submit_to_orderer(&self, request: OrderRequest) -> Result<OrderResult, ChannelError> {
        self.shared.submissions.lock().unwrap().push(request.clone());

        let behavior = self.shared.orderer.lock().unwrap().clone();
        match behavior {
            OrdererBehavior::Unavailable(cause) => return Err(ChannelError::Transport(cause)),
            OrdererBehavior::Reject(code) => return Ok(OrderResult::failure(code)),
            OrdererBehavior::Accept => {}
        }

        if request.responses.is_empty()
            || !request.responses.iter().all(|r| verify_endorsement(&request.proposal.hash, r))
        {
            return Ok(OrderResult::failure("BAD_REQUEST"));
        }

        let block = self.shared.height.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.shared.commit_delay.lock().unwrap();
        let peers = self.shared.peers.clone();
        let tx_id = request.tx_id;

        if delay.is_zero() {
            peers.iter().for_each(|p| p.deliver(&tx_id, block));
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                peers.iter().for_each(|p| p.deliver(&tx_id, block));
            });
        }
        Ok(OrderResult::success())
    }

    fn event_peers_for_org(&self) -> Vec<Arc<dyn EventPeer>> {
        self.shared
            .peers
            .iter()
            .filter(|p| p.msp_id() == self.msp_id)
            .map(|p| Arc::clone(p) as Arc<dyn EventPeer>)
            .collect()
    }

    fn peers(&self) -> Vec<ChannelPeer> {
        self.shared
            .peers
            .iter()
            .map(|p| ChannelPeer { name: p.peer_name().clone(), msp_id: p.msp_id().to_string() })
            .collect()
    }
}
