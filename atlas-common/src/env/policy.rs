use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MEMBER_ROLE: &str = "member";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRole {
    pub name: String,
    #[serde(rename = "mspId")]
    pub msp_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyIdentity {
    pub role: PolicyRole,
}

/// Signature rule of an endorsement policy.
///
/// Serialized in the ledger's policy language: `{"signed-by": 0}` or
/// `{"2-of": [ ... ]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum PolicyRule {
    /// Index into the policy's identity list.
    SignedBy(usize),
    OutOf { n: usize, rules: Vec<PolicyRule> },
}

impl PolicyRule {
    fn max_identity(&self) -> Option<usize> {
        match self {
            PolicyRule::SignedBy(i) => Some(*i),
            PolicyRule::OutOf { rules, .. } => rules.iter().filter_map(PolicyRule::max_identity).max(),
        }
    }

    fn check_thresholds(&self) -> Result<(), String> {
        match self {
            PolicyRule::SignedBy(_) => Ok(()),
            PolicyRule::OutOf { n, rules } => {
                if *n == 0 || *n > rules.len() {
                    return Err(format!("{}-of rule has {} sub-rules", n, rules.len()));
                }
                rules.iter().try_for_each(PolicyRule::check_thresholds)
            }
        }
    }
}

impl From<PolicyRule> for Value {
    fn from(rule: PolicyRule) -> Self {
        let mut map = Map::new();
        match rule {
            PolicyRule::SignedBy(i) => {
                map.insert("signed-by".to_string(), Value::from(i));
            }
            PolicyRule::OutOf { n, rules } => {
                let rules = rules.into_iter().map(Value::from).collect();
                map.insert(format!("{}-of", n), Value::Array(rules));
            }
        }
        Value::Object(map)
    }
}

impl TryFrom<Value> for PolicyRule {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) if map.len() == 1 => map,
            other => return Err(format!("policy rule must be a single-key object, got {}", other)),
        };
        let (key, body) = map.into_iter().next().ok_or("empty policy rule")?;

        if key == "signed-by" {
            let index = body
                .as_u64()
                .ok_or_else(|| format!("signed-by expects an index, got {}", body))?;
            return Ok(PolicyRule::SignedBy(index as usize));
        }

        let n = key
            .strip_suffix("-of")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| format!("unknown policy rule {}", key))?;
        let rules = match body {
            Value::Array(items) => items
                .into_iter()
                .map(PolicyRule::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(format!("{} expects a list, got {}", key, other)),
        };
        Ok(PolicyRule::OutOf { n, rules })
    }
}

/// Endorsement policy attached to an instantiate or upgrade proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementPolicy {
    pub identities: Vec<PolicyIdentity>,
    pub policy: PolicyRule,
}

impl EndorsementPolicy {
    /// N-of-N policy over the member role of every given MSP.
    ///
    /// Ids are deduplicated and sorted so the result does not depend on
    /// peer discovery order.
    pub fn all_of<I, S>(msp_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let msp_ids: BTreeSet<String> = msp_ids.into_iter().map(Into::into).collect();
        let identities: Vec<PolicyIdentity> = msp_ids
            .into_iter()
            .map(|msp_id| PolicyIdentity {
                role: PolicyRole { name: MEMBER_ROLE.to_string(), msp_id },
            })
            .collect();
        let rules = (0..identities.len()).map(PolicyRule::SignedBy).collect();

        Self {
            policy: PolicyRule::OutOf { n: identities.len(), rules },
            identities,
        }
    }

    pub fn msp_ids(&self) -> Vec<&str> {
        self.identities.iter().map(|i| i.role.msp_id.as_str()).collect()
    }

    /// Checks that every `signed-by` points at an identity and every
    /// threshold is reachable.
    pub fn validate(&self) -> Result<(), String> {
        if self.identities.is_empty() {
            return Err("endorsement policy names no identities".to_string());
        }
        if let Some(max) = self.policy.max_identity() {
            if max >= self.identities.len() {
                return Err(format!(
                    "signed-by {} out of range for {} identities",
                    max,
                    self.identities.len()
                ));
            }
        }
        self.policy.check_thresholds()
    }
}
