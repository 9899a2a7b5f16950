use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

use atlas_common::env::{CommitOutcome, PeerCommit};
use atlas_common::transactions::TransactionId;

use crate::logging::GATEWAY_TARGET;
use crate::ports::{ChannelHandle, CommitSubscription, EventPeer};

enum Registration {
    Armed {
        subscription: CommitSubscription,
        deadline: Pin<Box<Sleep>>,
    },
    Failed(String),
}

/// Waits for one peer to report the commit of a transaction.
///
/// The deadline starts at registration, not when [`CommitListener::wait`]
/// is first polled.
pub struct CommitListener {
    peer: Arc<dyn EventPeer>,
    tx_id: TransactionId,
    registration: Registration,
}

impl CommitListener {
    pub fn register(peer: Arc<dyn EventPeer>, tx_id: &TransactionId, ceiling: Duration) -> Self {
        let registration = match peer.register_tx_listener(tx_id) {
            Ok(subscription) => Registration::Armed {
                subscription,
                deadline: Box::pin(tokio::time::sleep(ceiling)),
            },
            Err(e) => {
                warn!("failed to register commit listener on {}: {}", peer.address(), e);
                Registration::Failed(e.to_string())
            }
        };
        Self { peer, tx_id: tx_id.clone(), registration }
    }

    /// Resolves exactly once. The listener is unregistered on every path;
    /// only a timeout disconnects the peer.
    pub async fn wait(self) -> PeerCommit {
        let CommitListener { peer, tx_id, registration } = self;

        let outcome = match registration {
            Registration::Failed(cause) => CommitOutcome::ListenerError(cause),
            Registration::Armed { subscription, mut deadline } => {
                tokio::select! {
                    biased;
                    event = subscription.event() => {
                        peer.unregister_tx_listener(&tx_id);
                        match event {
                            Ok(event) if event.is_valid() => CommitOutcome::Valid,
                            Ok(event) => CommitOutcome::Invalid(event.code),
                            Err(cause) => CommitOutcome::ListenerError(cause),
                        }
                    }
                    _ = &mut deadline => {
                        peer.unregister_tx_listener(&tx_id);
                        peer.disconnect();
                        CommitOutcome::TimedOut
                    }
                }
            }
        };

        let commit = PeerCommit { peer: peer.name(), address: peer.address(), outcome };
        match &commit.outcome {
            CommitOutcome::Valid => debug!("transaction {} committed on {}", tx_id, commit.address),
            other => warn!("transaction {} on {}: {}", tx_id, commit.address, other),
        }
        commit
    }
}

/// One listener per event peer of the client's organization.
pub struct CommitListenerSet {
    listeners: Vec<CommitListener>,
}

impl CommitListenerSet {
    /// Registers on every org event peer before returning.
    pub fn register_all(channel: &dyn ChannelHandle, tx_id: &TransactionId, ceiling: Duration) -> Self {
        let listeners: Vec<CommitListener> = channel
            .event_peers_for_org()
            .into_iter()
            .map(|peer| CommitListener::register(peer, tx_id, ceiling))
            .collect();

        info!(
            target: GATEWAY_TARGET,
            "EVENT:LISTEN tx={} peers={} ceiling_ms={}",
            tx_id,
            listeners.len(),
            ceiling.as_millis()
        );
        Self { listeners }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Outcomes in event-peer order.
    pub async fn settle(self) -> Vec<PeerCommit> {
        join_all(self.listeners.into_iter().map(CommitListener::wait)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::env::CommitEvent;
    use atlas_common::utils::PeerName;
    use atlas_common::ChannelError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::ports::CommitNotifier;

    #[derive(Default)]
    struct MockPeer {
        notifier: Mutex<Option<CommitNotifier>>,
        fail_registration: bool,
        unregisters: AtomicUsize,
        disconnects: AtomicUsize,
    }

    impl MockPeer {
        fn fire(&self, result: Result<CommitEvent, String>) {
            if let Some(tx) = self.notifier.lock().unwrap().take() {
                let _ = tx.send(result);
            }
        }
    }

    impl EventPeer for MockPeer {
        fn name(&self) -> PeerName {
            "peer0.org1".into()
        }

        fn address(&self) -> String {
            "localhost:7053".to_string()
        }

        fn register_tx_listener(&self, _tx_id: &TransactionId) -> Result<CommitSubscription, ChannelError> {
            if self.fail_registration {
                return Err(ChannelError::Transport("event hub not connected".into()));
            }
            let (tx, sub) = CommitSubscription::pair();
            *self.notifier.lock().unwrap() = Some(tx);
            Ok(sub)
        }

        fn unregister_tx_listener(&self, _tx_id: &TransactionId) {
            self.unregisters.fetch_add(1, Ordering::SeqCst);
        }

        fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tx() -> TransactionId {
        TransactionId::from_raw("tx-1", false)
    }

    fn event(code: &str) -> CommitEvent {
        CommitEvent { tx_id: "tx-1".into(), code: code.into(), block_number: 7 }
    }

    #[tokio::test(start_paused = true)]
    async fn valid_event_resolves_without_disconnect() {
        let peer = Arc::new(MockPeer::default());
        let listener = CommitListener::register(peer.clone(), &tx(), Duration::from_secs(30));
        peer.fire(Ok(event("VALID")));

        let commit = listener.wait().await;
        assert_eq!(commit.outcome, CommitOutcome::Valid);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(peer.unregisters.load(Ordering::SeqCst), 1);
        assert_eq!(peer.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_code_is_reported() {
        let peer = Arc::new(MockPeer::default());
        let listener = CommitListener::register(peer.clone(), &tx(), Duration::from_secs(30));
        peer.fire(Ok(event("MVCC_READ_CONFLICT")));

        let commit = listener.wait().await;
        assert_eq!(commit.outcome, CommitOutcome::Invalid("MVCC_READ_CONFLICT".into()));
        assert_eq!(peer.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_disconnects_exactly_once() {
        let peer = Arc::new(MockPeer::default());
        let listener = CommitListener::register(peer.clone(), &tx(), Duration::from_secs(30));

        let commit = listener.wait().await;
        assert_eq!(commit.outcome, CommitOutcome::TimedOut);
        assert_eq!(peer.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(peer.unregisters.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_from_registration() {
        let peer = Arc::new(MockPeer::default());
        let listener = CommitListener::register(peer.clone(), &tx(), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(29)).await;
        let start = tokio::time::Instant::now();
        let commit = listener.wait().await;

        assert_eq!(commit.outcome, CommitOutcome::TimedOut);
        assert!(start.elapsed() <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn event_source_error_is_listener_error() {
        let peer = Arc::new(MockPeer::default());
        let listener = CommitListener::register(peer.clone(), &tx(), Duration::from_secs(30));
        peer.fire(Err("event hub shutdown".into()));

        let commit = listener.wait().await;
        assert_eq!(commit.outcome, CommitOutcome::ListenerError("event hub shutdown".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_registration_resolves_immediately() {
        let peer = Arc::new(MockPeer { fail_registration: true, ..Default::default() });
        let listener = CommitListener::register(peer.clone(), &tx(), Duration::from_secs(30));

        let commit = listener.wait().await;
        assert!(matches!(commit.outcome, CommitOutcome::ListenerError(_)));
        assert_eq!(peer.unregisters.load(Ordering::SeqCst), 0);
        assert_eq!(peer.disconnects.load(Ordering::SeqCst), 0);
    }
}
