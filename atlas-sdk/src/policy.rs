use atlas_common::env::EndorsementPolicy;
use atlas_common::{GatewayError, Result};

use crate::ports::ChannelHandle;

/// N-of-N policy over the distinct organizations holding peers on `channel`.
pub fn default_endorsement_policy(channel: &dyn ChannelHandle) -> Result<EndorsementPolicy> {
    let peers = channel.peers();
    if peers.is_empty() {
        return Err(GatewayError::Configuration(format!(
            "channel {} has no peers to derive an endorsement policy from",
            channel.name()
        )));
    }
    Ok(EndorsementPolicy::all_of(peers.into_iter().map(|p| p.msp_id)))
}

/// The caller's policy when it is well formed, otherwise the channel default.
pub fn resolve_policy(requested: Option<EndorsementPolicy>, channel: &dyn ChannelHandle) -> Result<EndorsementPolicy> {
    match requested {
        Some(policy) => {
            policy
                .validate()
                .map_err(|e| GatewayError::Configuration(format!("invalid endorsement policy: {}", e)))?;
            Ok(policy)
        }
        None => default_endorsement_policy(channel),
    }
}
