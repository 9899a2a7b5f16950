mod cli;

use std::fs;

use clap::Parser;
use tracing::{info, warn};

use atlas_common::env::EndorsementPolicy;
use atlas_common::transactions::{ChaincodeType, DeployRequest, InstallRequest};
use atlas_sdk::in_memory::{CommitBehavior, EndorseBehavior, InMemoryNetwork, InMemoryPeer, OrdererBehavior};
use atlas_sdk::logging::init_tracing;
use atlas_sdk::{Gateway, GatewayConfig};

use cli::{Cli, Commands, Deploy, Script};

fn apply_script(network: &InMemoryNetwork, channel: &str, script: &Script) {
    let scripted = |names: &[String], apply: &dyn Fn(&InMemoryPeer)| {
        for name in names {
            match network.peer(name) {
                Some(peer) => apply(peer.as_ref()),
                None => warn!("no peer named {}", name),
            }
        }
    };

    scripted(script.reject.as_slice(), &|p: &InMemoryPeer| {
        p.set_endorse_behavior(EndorseBehavior::Reject { status: 500, msg: "rejected by simulator".into() })
    });
    scripted(script.unreachable.as_slice(), &|p: &InMemoryPeer| {
        p.set_endorse_behavior(EndorseBehavior::Unreachable("14 UNAVAILABLE: connect ECONNREFUSED".into()))
    });
    scripted(script.silent.as_slice(), &|p: &InMemoryPeer| p.set_commit_behavior(CommitBehavior::Silent));

    if let Some(payload) = &script.payload {
        for org in ["Org1", "Org2"] {
            for peer in network.org_peers(org) {
                peer.set_payload(payload.as_bytes().to_vec());
            }
        }
    }
    if let Some(code) = &script.orderer_status {
        network.set_orderer_behavior(channel, OrdererBehavior::Reject(code.clone()));
    }
}

fn deploy_request(deploy: &Deploy) -> Result<DeployRequest, Box<dyn std::error::Error>> {
    let endorsement_policy = match &deploy.policy {
        Some(path) => Some(serde_json::from_str::<EndorsementPolicy>(&fs::read_to_string(path)?)?),
        None => None,
    };
    Ok(DeployRequest {
        chaincode_id: deploy.chaincode.clone(),
        version: deploy.version.clone(),
        chaincode_type: ChaincodeType::Golang,
        args: deploy.args.clone(),
        endorsement_policy,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GatewayConfig::load_from_file(path)?,
        None => GatewayConfig::default(),
    }
    .with_env_overrides();

    fs::create_dir_all(&config.log_dir)?;
    let _guard = init_tracing(&config.log_dir, "gateway-sim")?;
    info!("simulating org {} on channel {}", config.org_name, config.channel_name);

    let network = InMemoryNetwork::sample();
    apply_script(&network, &config.channel_name, &cli.script);
    let gateway = Gateway::new(network.provider(), config);

    let envelope = match cli.command {
        Commands::Invoke { chaincode, function, args, peers, org, user, channel } => {
            gateway.invoke(&peers, &channel, &chaincode, &function, &args, &org, &user).await
        }
        Commands::Instantiate(deploy) => {
            let request = deploy_request(&deploy)?;
            gateway.instantiate(&deploy.org, &deploy.channel, request).await
        }
        Commands::Upgrade(deploy) => {
            let request = deploy_request(&deploy)?;
            gateway.upgrade(&deploy.org, &deploy.channel, request).await
        }
        Commands::Install { chaincode, path, version, org } => {
            let request = InstallRequest {
                chaincode_id: chaincode,
                chaincode_path: path,
                version,
                chaincode_type: ChaincodeType::Golang,
                metadata_path: None,
            };
            gateway.install(&org, request).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
