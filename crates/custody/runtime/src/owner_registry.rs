//! Owner Registry: the immutable set of authorized principals
//!
//! Built once from a validated [`WalletConfig`] and shared by reference
//! for the lifetime of a wallet. There are no mutation methods.

use custody_types::{CustodyError, CustodyResult, OwnerId, WalletConfig};
use std::collections::HashSet;
use tracing::debug;

/// Owners and quorum of one wallet
#[derive(Clone, Debug)]
pub struct OwnerRegistry {
    /// Owners in insertion order
    owners: Vec<OwnerId>,
    /// Membership index
    index: HashSet<OwnerId>,
    /// Required confirmation count
    quorum: u32,
}

impl OwnerRegistry {
    /// Build a registry, failing `InvalidConfiguration` for an empty or
    /// duplicated owner list or a quorum outside `1..=owners`.
    pub fn new(config: WalletConfig) -> CustodyResult<Self> {
        config.validate()?;

        let index = config.owners.iter().cloned().collect();

        debug!(
            owners = config.owners.len(),
            quorum = config.quorum,
            "Owner registry created"
        );

        Ok(Self {
            owners: config.owners,
            index,
            quorum: config.quorum,
        })
    }

    pub fn is_owner(&self, principal: &OwnerId) -> bool {
        self.index.contains(principal)
    }

    /// Fail `NotOwner` unless `principal` is registered
    pub fn ensure_owner(&self, principal: &OwnerId) -> CustodyResult<()> {
        if self.is_owner(principal) {
            Ok(())
        } else {
            Err(CustodyError::NotOwner(principal.clone()))
        }
    }

    /// Owners in the order they were configured
    pub fn list_owners(&self) -> &[OwnerId] {
        &self.owners
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn config(&self) -> WalletConfig {
        WalletConfig::new(self.owners.clone(), self.quorum)
    }
}
