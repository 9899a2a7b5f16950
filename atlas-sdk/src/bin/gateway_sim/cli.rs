use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gateway-sim")]
#[command(about = "Runs gateway flows against an in-memory ledger network")]
pub struct Cli {
    /// Gateway configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub script: Script,

    #[command(subcommand)]
    pub command: Commands,
}

/// Behaviour of the simulated network.
#[derive(Args)]
pub struct Script {
    /// Peer that rejects proposals with status 500
    #[arg(long, value_name = "PEER")]
    pub reject: Vec<String>,

    /// Peer that cannot be reached
    #[arg(long, value_name = "PEER")]
    pub unreachable: Vec<String>,

    /// Peer that never delivers commit events
    #[arg(long, value_name = "PEER")]
    pub silent: Vec<String>,

    /// Status the orderer answers with instead of SUCCESS
    #[arg(long, value_name = "CODE")]
    pub orderer_status: Option<String>,

    /// Chaincode payload every endorsing peer returns
    #[arg(long)]
    pub payload: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Invoke a chaincode function
    Invoke {
        chaincode: String,
        function: String,
        args: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        peers: Vec<String>,
        #[arg(long, default_value = "")]
        org: String,
        #[arg(long, default_value = "")]
        user: String,
        #[arg(long, default_value = "")]
        channel: String,
    },
    /// Instantiate a chaincode on a channel
    Instantiate(Deploy),
    /// Upgrade a chaincode on a channel
    Upgrade(Deploy),
    /// Install a chaincode package on the organization's peers
    Install {
        chaincode: String,
        path: String,
        version: String,
        #[arg(long, default_value = "")]
        org: String,
    },
}

#[derive(Args)]
pub struct Deploy {
    pub chaincode: String,
    pub version: String,
    pub args: Vec<String>,
    #[arg(long, default_value = "")]
    pub org: String,
    #[arg(long, default_value = "")]
    pub channel: String,
    /// Endorsement policy file (JSON); defaults to every organization on the channel
    #[arg(long, value_name = "FILE")]
    pub policy: Option<PathBuf>,
}
