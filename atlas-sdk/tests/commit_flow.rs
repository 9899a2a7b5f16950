mod common;

use std::time::Duration;

use serde_json::json;

use atlas_common::env::envelope::STATUS_UNCONFIRMED;
use atlas_common::env::{ErrorDetail, MessageDetail};
use atlas_common::transactions::TransactionRequest;
use atlas_common::Result;
use atlas_sdk::context::ContextKey;
use atlas_sdk::in_memory::{CommitBehavior, EndorseBehavior, InMemoryNetwork, OrdererBehavior};
use atlas_sdk::ports::{ChannelHandle, LedgerClient};
use atlas_sdk::{CoordinatorState, FlowKind, RequestOutcome};

use common::*;

async fn invoke_move(network: &InMemoryNetwork) -> atlas_common::env::ResponseEnvelope {
    gateway(network)
        .invoke(&all_peers(), CHANNEL, CHAINCODE, "move", &args(&["a", "b", "10"]), "Org1", "user1")
        .await
}

#[tokio::test(start_paused = true)]
async fn happy_path_commits_with_decoded_payload() {
    let network = InMemoryNetwork::sample();
    set_payload(&network, r#"{"balance":90}"#);

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), 200);
    assert_eq!(env.payload(), &json!({"balance": 90}));
    assert_eq!(env.message, "Success");
    assert_eq!(env.detail, MessageDetail::Text("Success".into()));
    assert!(env.diagnostics.is_empty());

    assert_eq!(network.order_submissions(CHANNEL).len(), 1);
    assert_eq!(network.order_submissions(CHANNEL)[0].responses.len(), 3);
    for name in [ORG1_PEER0, ORG1_PEER1] {
        let peer = network.peer(name).unwrap();
        assert_eq!(peer.registrations(), 1);
        assert_eq!(peer.unregistrations(), 1);
        assert_eq!(peer.disconnects(), 0);
    }
    // Only the caller's organization is listened on.
    assert_eq!(network.peer(ORG2_PEER0).unwrap().registrations(), 0);
}

#[tokio::test(start_paused = true)]
async fn plain_text_payload_is_returned_as_string() {
    let network = InMemoryNetwork::sample();
    set_payload(&network, "moved 10 from a to b");

    let env = invoke_move(&network).await;
    assert_eq!(env.status(), 200);
    assert_eq!(env.payload(), &json!("moved 10 from a to b"));
}

#[tokio::test(start_paused = true)]
async fn single_rejection_fails_endorsement_and_skips_ordering() {
    let network = InMemoryNetwork::sample();
    network
        .peer(ORG1_PEER1)
        .unwrap()
        .set_endorse_behavior(EndorseBehavior::Reject { status: 500, msg: "insufficient funds".into() });

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), 500);
    assert_eq!(env.message, "insufficient funds");
    assert_eq!(
        env.detail,
        MessageDetail::Errors(vec![ErrorDetail { status: 500, msg: "insufficient funds".into() }])
    );
    assert!(network.order_submissions(CHANNEL).is_empty());
    assert_eq!(network.peer(ORG1_PEER0).unwrap().registrations(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_only_is_unconfirmed() {
    let network = InMemoryNetwork::sample();
    network
        .peer(ORG2_PEER0)
        .unwrap()
        .set_endorse_behavior(EndorseBehavior::Unreachable("14 UNAVAILABLE: connect ECONNREFUSED".into()));

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), STATUS_UNCONFIRMED);
    assert_eq!(env.message, "proposal resulted in an error :: 14 UNAVAILABLE: connect ECONNREFUSED");
    assert_eq!(env.detail, MessageDetail::Text(env.message.clone()));
    assert!(network.order_submissions(CHANNEL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_target_peer_fails_endorsement() {
    let network = InMemoryNetwork::sample();
    let mut peers = all_peers();
    peers.push("peer9.org1.example.com".to_string());

    let env = gateway(&network)
        .invoke(&peers, CHANNEL, CHAINCODE, "move", &args(&["a", "b", "1"]), "Org1", "user1")
        .await;

    assert_eq!(env.status(), STATUS_UNCONFIRMED);
    assert!(env.message.contains("peer9.org1.example.com"));
}

#[tokio::test(start_paused = true)]
async fn silent_listener_times_out_but_order_result_wins() {
    let network = InMemoryNetwork::sample();
    let silent = network.peer(ORG1_PEER1).unwrap();
    silent.set_commit_behavior(CommitBehavior::Silent);

    let started = tokio::time::Instant::now();
    let env = invoke_move(&network).await;

    assert_eq!(env.status(), 200);
    assert_eq!(env.message, "Success");
    assert_eq!(env.diagnostics, vec![format!("REQUEST_TIMEOUT:{}:7053", ORG1_PEER1)]);
    assert!(started.elapsed() >= Duration::from_secs(30));

    assert_eq!(silent.disconnects(), 1);
    assert_eq!(silent.unregistrations(), 1);
    assert_eq!(network.peer(ORG1_PEER0).unwrap().disconnects(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_commit_is_diagnostic_only() {
    let network = InMemoryNetwork::sample();
    network
        .peer(ORG1_PEER0)
        .unwrap()
        .set_commit_behavior(CommitBehavior::Deliver("MVCC_READ_CONFLICT".into()));

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), 200);
    assert_eq!(
        env.diagnostics,
        vec![format!("The transaction was invalid on {}:7053, code:MVCC_READ_CONFLICT", ORG1_PEER0)]
    );
    assert_eq!(network.peer(ORG1_PEER0).unwrap().disconnects(), 0);
}

#[tokio::test(start_paused = true)]
async fn refused_registration_does_not_block_commit() {
    let network = InMemoryNetwork::sample();
    network
        .peer(ORG1_PEER0)
        .unwrap()
        .set_commit_behavior(CommitBehavior::RefuseRegistration("event hub not connected".into()));

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), 200);
    assert_eq!(env.diagnostics.len(), 1);
    assert!(env.diagnostics[0].contains("event hub not connected"));
}

#[tokio::test(start_paused = true)]
async fn orderer_rejection_is_unconfirmed_with_code() {
    let network = InMemoryNetwork::sample();
    network.set_orderer_behavior(CHANNEL, OrdererBehavior::Reject("BAD_REQUEST".into()));

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), STATUS_UNCONFIRMED);
    assert_eq!(env.message, "Failed to order the transaction. Error code: BAD_REQUEST");
    assert_eq!(env.detail, MessageDetail::Text(env.message.clone()));
    // Nothing was committed, so every org listener ran into its ceiling.
    assert_eq!(env.diagnostics.len(), 2);
    assert_eq!(network.block_height(CHANNEL), 0);
}

#[tokio::test(start_paused = true)]
async fn orderer_outage_is_caught_as_unconfirmed() {
    let network = InMemoryNetwork::sample();
    network.set_orderer_behavior(CHANNEL, OrdererBehavior::Unavailable("orderer connection lost".into()));

    let env = invoke_move(&network).await;

    assert_eq!(env.status(), STATUS_UNCONFIRMED);
    assert_eq!(env.message, "orderer connection lost");
}

#[tokio::test(start_paused = true)]
async fn undefined_channel_aborts_before_sending() {
    let network = InMemoryNetwork::sample();

    let env = gateway(&network)
        .invoke(&all_peers(), "nochannel", CHAINCODE, "move", &args(&[]), "Org1", "user1")
        .await;

    assert_eq!(env.status(), STATUS_UNCONFIRMED);
    assert_eq!(env.message, "Channel nochannel was not defined in the connection profile");
    assert_eq!(network.proposals_sent(CHANNEL), 0);
}

#[tokio::test(start_paused = true)]
async fn divergent_write_sets_still_commit() {
    let network = InMemoryNetwork::sample();
    network.peer(ORG1_PEER0).unwrap().set_write_set(b"a=90".to_vec());
    network.peer(ORG1_PEER1).unwrap().set_write_set(b"a=91".to_vec());

    let env = invoke_move(&network).await;
    assert_eq!(env.status(), 200);
}

#[tokio::test(start_paused = true)]
async fn delayed_block_delivery_is_awaited() {
    let network = InMemoryNetwork::sample();
    network.set_commit_delay(CHANNEL, Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let env = invoke_move(&network).await;

    assert_eq!(env.status(), 200);
    assert!(env.diagnostics.is_empty());
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(30));
}

fn query_all_peers(client: &dyn LedgerClient, channel: &dyn ChannelHandle) -> Result<TransactionRequest> {
    Ok(TransactionRequest {
        targets: vec![],
        channel: channel.name().to_string(),
        chaincode_id: CHAINCODE.to_string(),
        function: "query".to_string(),
        args: vec![],
        tx_id: client.new_transaction_id(false),
        deployment: None,
    })
}

#[tokio::test(start_paused = true)]
async fn coordinator_walks_the_state_machine() {
    let network = InMemoryNetwork::sample();
    let gateway = gateway(&network);

    let report = gateway
        .execute(FlowKind::Invoke, &ContextKey::new("Org1", None), CHANNEL, query_all_peers)
        .await
        .unwrap();

    assert_eq!(
        report.states,
        vec![
            CoordinatorState::Init,
            CoordinatorState::Endorsing,
            CoordinatorState::Committing,
            CoordinatorState::Committed
        ]
    );
    assert!(matches!(report.outcome, RequestOutcome::Committed { .. }));
    // Empty targets fall back to every peer on the channel.
    let submissions = network.order_submissions(CHANNEL);
    assert_eq!(submissions[0].responses.len(), 3);
    assert_eq!(submissions[0].tx_id, report.tx_id);
}

#[tokio::test(start_paused = true)]
async fn failed_order_state_is_terminal() {
    let network = InMemoryNetwork::sample();
    network.set_orderer_behavior(CHANNEL, OrdererBehavior::Reject("SERVICE_UNAVAILABLE".into()));
    let gateway = gateway(&network);

    let report = gateway
        .execute(FlowKind::Invoke, &ContextKey::new("Org1", None), CHANNEL, query_all_peers)
        .await
        .unwrap();

    assert_eq!(report.final_state(), CoordinatorState::FailedOrder);
    assert_eq!(report.outcome.commits().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn endorsement_failure_state_is_terminal() {
    let network = InMemoryNetwork::sample();
    network
        .peer(ORG2_PEER0)
        .unwrap()
        .set_endorse_behavior(EndorseBehavior::Respond { status: 403, message: "access denied".into() });
    let gateway = gateway(&network);

    let report = gateway
        .execute(FlowKind::Invoke, &ContextKey::new("Org1", None), CHANNEL, query_all_peers)
        .await
        .unwrap();

    assert_eq!(
        report.states,
        vec![CoordinatorState::Init, CoordinatorState::Endorsing, CoordinatorState::FailedEndorsement]
    );
    assert!(report.outcome.commits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_invocations_share_one_client() {
    let network = InMemoryNetwork::sample();
    let gateway = gateway(&network);
    let peers = all_peers();
    let first_args = args(&["a", "b", "1"]);
    let second_args = args(&["b", "a", "2"]);

    let (first, second) = tokio::join!(
        gateway.invoke(&peers, CHANNEL, CHAINCODE, "move", &first_args, "Org1", "user1"),
        gateway.invoke(&peers, CHANNEL, CHAINCODE, "move", &second_args, "Org1", "user1"),
    );

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);
    assert_eq!(network.client_builds(), 1);
    assert_eq!(network.block_height(CHANNEL), 2);
}
