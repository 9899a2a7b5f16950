use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use atlas_common::env::endorsement::STATUS_ENDORSED;
use atlas_common::env::proposal::endorsement_signing_bytes;
use atlas_common::env::{ChaincodeResponse, CommitEvent, EndorsedResponse, Endorsement, RawProposalResponse};
use atlas_common::transactions::TransactionId;
use atlas_common::utils::PeerName;
use atlas_common::ChannelError;

use crate::ports::{CommitNotifier, CommitSubscription, EventPeer};

/// How a peer answers proposals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndorseBehavior {
    Endorse,
    /// Chaincode error carrying an embedded `{"status","msg"}` object.
    Reject { status: u16, msg: String },
    /// Transport failure with the given text.
    Unreachable(String),
    /// A response with a non-200 status and no endorsement.
    Respond { status: u16, message: String },
}

/// How a peer's event source treats a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitBehavior {
    /// Deliver the block event with this validation code.
    Deliver(String),
    /// Never deliver anything.
    Silent,
    /// Fail the listener with this message.
    Fail(String),
    /// Refuse listener registration.
    RefuseRegistration(String),
}

impl Default for CommitBehavior {
    fn default() -> Self {
        CommitBehavior::Deliver(atlas_common::env::commit::VALID_CODE.to_string())
    }
}

pub struct InMemoryPeer {
    name: PeerName,
    msp_id: String,
    signing_key: SigningKey,
    endorse: Mutex<EndorseBehavior>,
    commit: Mutex<CommitBehavior>,
    payload: Mutex<Vec<u8>>,
    write_set: Mutex<Vec<u8>>,
    listeners: Mutex<HashMap<String, CommitNotifier>>,
    proposals: AtomicUsize,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
    disconnects: AtomicUsize,
}

impl InMemoryPeer {
    pub fn new(name: &str, msp_id: &str) -> Self {
        Self {
            name: PeerName::from(name),
            msp_id: msp_id.to_string(),
            signing_key: SigningKey::generate(&mut OsRng),
            endorse: Mutex::new(EndorseBehavior::Endorse),
            commit: Mutex::new(CommitBehavior::default()),
            payload: Mutex::new(Vec::new()),
            write_set: Mutex::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            proposals: AtomicUsize::new(0),
            registrations: AtomicUsize::new(0),
            unregistrations: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn peer_name(&self) -> &PeerName {
        &self.name
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn set_endorse_behavior(&self, behavior: EndorseBehavior) {
        *self.endorse.lock().unwrap() = behavior;
    }

    pub fn set_commit_behavior(&self, behavior: CommitBehavior) {
        *self.commit.lock().unwrap() = behavior;
    }

    /// Chaincode payload returned with every endorsement.
    pub fn set_payload(&self, payload: impl Into<Vec<u8>>) {
        *self.payload.lock().unwrap() = payload.into();
    }

    pub fn set_write_set(&self, write_set: impl Into<Vec<u8>>) {
        *self.write_set.lock().unwrap() = write_set.into();
    }

    pub fn proposals_seen(&self) -> usize {
        self.proposals.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Simulates a proposal and answers according to the current behaviour.
    pub(crate) fn endorse(&self, proposal_hash: &str) -> RawProposalResponse {
        self.proposals.fetch_add(1, Ordering::SeqCst);
        let behavior = self.endorse.lock().unwrap().clone();

        match behavior {
            EndorseBehavior::Endorse => {
                let payload = self.payload.lock().unwrap().clone();
                let write_set = self.write_set.lock().unwrap().clone();
                let signature = self
                    .signing_key
                    .sign(&endorsement_signing_bytes(proposal_hash, &payload, &write_set));

                RawProposalResponse::Response {
                    peer: self.name.clone(),
                    response: Some(ChaincodeResponse {
                        status: STATUS_ENDORSED,
                        message: String::new(),
                        payload,
                    }),
                    endorsement: Some(Endorsement {
                        endorser: self.signing_key.verifying_key().to_bytes().to_vec(),
                        signature: signature.to_bytes().to_vec(),
                    }),
                    write_set,
                }
            }
            EndorseBehavior::Reject { status, msg } => RawProposalResponse::Error {
                peer: self.name.clone(),
                message: serde_json::json!({ "status": status, "msg": msg }).to_string(),
            },
            EndorseBehavior::Unreachable(cause) => RawProposalResponse::Error {
                peer: self.name.clone(),
                message: cause,
            },
            EndorseBehavior::Respond { status, message } => RawProposalResponse::Response {
                peer: self.name.clone(),
                response: Some(ChaincodeResponse { status, message, payload: Vec::new() }),
                endorsement: None,
                write_set: Vec::new(),
            },
        }
    }

    /// Hands a committed transaction to the listener registered for it, if any.
    pub(crate) fn deliver(&self, tx_id: &TransactionId, block_number: u64) {
        let behavior = self.commit.lock().unwrap().clone();
        let event = match behavior {
            CommitBehavior::Deliver(code) => Ok(CommitEvent {
                tx_id: tx_id.as_str().to_string(),
                code,
                block_number,
            }),
            CommitBehavior::Fail(cause) => Err(cause),
            CommitBehavior::Silent | CommitBehavior::RefuseRegistration(_) => return,
        };

        let notifier = self.listeners.lock().unwrap().remove(tx_id.as_str());
        if let Some(notifier) = notifier {
            let _ = notifier.send(event);
        }
    }
}

impl EventPeer for InMemoryPeer {
    fn name(&self) -> PeerName {
        self.name.clone()
    }

    fn address(&self) -> String {
        format!("{}:7053", self.name)
    }

    fn register_tx_listener(&self, tx_id: &TransactionId) -> Result<CommitSubscription, ChannelError> {
        if let CommitBehavior::RefuseRegistration(cause) = &*self.commit.lock().unwrap() {
            return Err(ChannelError::Unreachable {
                peer: self.name.to_string(),
                cause: cause.clone(),
            });
        }

        let (notifier, subscription) = CommitSubscription::pair();
        self.listeners.lock().unwrap().insert(tx_id.as_str().to_string(), notifier);
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(subscription)
    }

    fn unregister_tx_listener(&self, tx_id: &TransactionId) {
        self.listeners.lock().unwrap().remove(tx_id.as_str());
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
    }

    /// Drops every pending listener on this peer.
    ///
    /// The simulated peer has one event-hub connection shared by all
    /// in-flight transactions, so a disconnect for one timed-out listener
    /// also closes the listeners of other transactions on the same peer.
    fn disconnect(&self) {
        self.listeners.lock().unwrap().clear();
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Checks an endorser's signature over the proposal hash, payload and write set.
pub fn verify_endorsement(proposal_hash: &str, response: &EndorsedResponse) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(response.endorsement.endorser.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&response.endorsement.signature) else {
        return false;
    };

    let message = endorsement_signing_bytes(proposal_hash, &response.payload, &response.write_set);
    verifying_key.verify(&message, &signature).is_ok()
}
