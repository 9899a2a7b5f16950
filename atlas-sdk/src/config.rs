use std::{fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

/// Gateway settings, loaded from a JSON file and overridable from the
/// environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Organization used when a call does not name one.
    pub org_name: String,
    pub user_name: Option<String>,
    pub channel_name: String,

    /// Commit listener ceilings per flow, in seconds.
    pub invoke_commit_timeout_secs: u64,
    pub instantiate_commit_timeout_secs: u64,
    pub upgrade_commit_timeout_secs: u64,

    pub invoke_proposal_timeout_secs: u64,
    pub deploy_proposal_timeout_secs: u64,

    /// Compare endorser write sets and warn on mismatch.
    pub compare_write_sets: bool,
    pub log_dir: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            org_name: "Org1".to_string(),
            user_name: None,
            channel_name: "mychannel".to_string(),
            invoke_commit_timeout_secs: 30,
            instantiate_commit_timeout_secs: 60,
            upgrade_commit_timeout_secs: 60,
            invoke_proposal_timeout_secs: 45,
            deploy_proposal_timeout_secs: 160,
            compare_write_sets: true,
            log_dir: "logs".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Applies `ORG_NAME`, `CHANNEL_NAME` and `USER_NAME` when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(org) = non_empty("ORG_NAME") {
            self.org_name = org;
        }
        if let Some(channel) = non_empty("CHANNEL_NAME") {
            self.channel_name = channel;
        }
        if let Some(user) = non_empty("USER_NAME") {
            self.user_name = Some(user);
        }
        self
    }

    pub fn invoke_proposal_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_proposal_timeout_secs)
    }

    pub fn deploy_proposal_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_proposal_timeout_secs)
    }
}
