//! Wallet configuration
//!
//! [`WalletConfig`] fixes who the owners are and how many of them must
//! confirm. It is immutable once a wallet is built from it. A change of
//! owners is a new config plus a migration, never an edit of a live wallet.

use crate::{CustodyError, CustodyResult, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Owner set and quorum for one wallet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Owners in insertion order
    pub owners: Vec<OwnerId>,
    /// Distinct confirmations required before a proposal may execute
    pub quorum: u32,
}

impl WalletConfig {
    pub fn new(owners: Vec<OwnerId>, quorum: u32) -> Self {
        Self { owners, quorum }
    }

    /// Simple majority of the given owners
    pub fn majority(owners: Vec<OwnerId>) -> Self {
        let quorum = (owners.len() / 2 + 1) as u32;
        Self { owners, quorum }
    }

    /// Every owner must confirm
    pub fn unanimous(owners: Vec<OwnerId>) -> Self {
        let quorum = owners.len() as u32;
        Self { owners, quorum }
    }

    /// Check the owner list is non-empty and duplicate-free and the quorum
    /// lies in `1..=owners.len()`.
    pub fn validate(&self) -> CustodyResult<()> {
        if self.owners.is_empty() {
            return Err(CustodyError::InvalidConfiguration(
                "owner list is empty".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.owners.len());
        for owner in &self.owners {
            if owner.as_str().trim().is_empty() {
                return Err(CustodyError::InvalidConfiguration(
                    "owner identifier is blank".into(),
                ));
            }
            if !seen.insert(owner) {
                return Err(CustodyError::InvalidConfiguration(format!(
                    "duplicate owner: {}",
                    owner
                )));
            }
        }

        if self.quorum == 0 {
            return Err(CustodyError::InvalidConfiguration(
                "quorum must be at least 1".into(),
            ));
        }

        if usize::try_from(self.quorum).map_or(true, |quorum| quorum > self.owners.len()) {
            return Err(CustodyError::InvalidConfiguration(format!(
                "quorum {} exceeds owner count {}",
                self.quorum,
                self.owners.len()
            )));
        }

        Ok(())
    }
}

/// When a proposal that has reached quorum is executed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// The confirmation that reaches quorum executes in the same call
    #[default]
    AutoOnQuorum,
    /// Execution always needs a separate `execute` call
    Explicit,
}

/// Runtime knobs that do not affect who may authorize what
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExecutionSettings {
    /// Auto-execute on quorum, or wait for `execute`
    #[serde(default)]
    pub policy: ExecutionPolicy,
    /// Lifetime of a proposal before it can no longer be confirmed or
    /// executed. `None` means proposals never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_ttl_secs: Option<u64>,
}

impl ExecutionSettings {
    /// Settings requiring a separate `execute` call
    pub fn explicit() -> Self {
        Self {
            policy: ExecutionPolicy::Explicit,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_proposal_ttl(mut self, ttl: Duration) -> Self {
        self.proposal_ttl_secs = Some(ttl.as_secs());
        self
    }

    /// TTL as a chrono duration. A TTL too large to represent is treated
    /// as no expiry at all.
    pub fn proposal_ttl(&self) -> Option<chrono::Duration> {
        self.proposal_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn auto_executes(&self) -> bool {
        self.policy == ExecutionPolicy::AutoOnQuorum
    }
}
