//! Persisted wallet state
//!
//! Layout: owners, quorum, settings, the append-only proposal list indexed
//! by id, and the event journal. The balance is not part of it; it belongs
//! to whichever ledger backs the wallet.

use crate::{
    CustodyError, CustodyResult, EventJournal, ExecutionSettings, OwnerId, Proposal, ProposalId,
    WalletConfig,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Serializable copy of a wallet's complete state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub owners: Vec<OwnerId>,
    pub quorum: u32,
    #[serde(default)]
    pub settings: ExecutionSettings,
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub journal: EventJournal,
    pub taken_at: DateTime<Utc>,
}

impl WalletSnapshot {
    pub fn config(&self) -> WalletConfig {
        WalletConfig::new(self.owners.clone(), self.quorum)
    }

    /// Re-check every invariant a live wallet maintains
    pub fn validate(&self) -> CustodyResult<()> {
        self.config()
            .validate()
            .map_err(|e| CustodyError::CorruptSnapshot(e.to_string()))?;

        let owners: HashSet<&OwnerId> = self.owners.iter().collect();

        for (index, proposal) in self.proposals.iter().enumerate() {
            let id = proposal.id;
            if id != ProposalId::new(index as u64) {
                return Err(corrupt(format!(
                    "proposal at position {} has id {}",
                    index, id
                )));
            }
            if proposal.target.is_null() {
                return Err(corrupt(format!("proposal {} has a null target", id)));
            }
            if let Some(reason) = proposal.action.validation_error() {
                return Err(corrupt(format!("proposal {}: {}", id, reason)));
            }
            if !owners.contains(&proposal.proposer) {
                return Err(corrupt(format!(
                    "proposal {} submitted by non-owner {}",
                    id, proposal.proposer
                )));
            }

            let mut confirmers = HashSet::new();
            for owner in proposal.confirmers() {
                if !owners.contains(owner) {
                    return Err(corrupt(format!(
                        "proposal {} confirmed by non-owner {}",
                        id, owner
                    )));
                }
                if !confirmers.insert(owner) {
                    return Err(corrupt(format!(
                        "proposal {} confirmed twice by {}",
                        id, owner
                    )));
                }
            }

            if proposal.is_executed() {
                if !proposal.has_quorum(self.quorum) {
                    return Err(corrupt(format!(
                        "proposal {} executed with {} of {} confirmations",
                        id,
                        proposal.confirmation_count(),
                        self.quorum
                    )));
                }
                if proposal.executed_at.is_none() {
                    return Err(corrupt(format!(
                        "proposal {} executed without a timestamp",
                        id
                    )));
                }
            }
        }

        if !self.journal.is_contiguous() {
            return Err(corrupt("event journal has gaps".into()));
        }

        Ok(())
    }
}

fn corrupt(reason: String) -> CustodyError {
    CustodyError::CorruptSnapshot(reason)
}
