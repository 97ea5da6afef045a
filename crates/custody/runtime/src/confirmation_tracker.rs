//! Confirmation Tracker: per-proposal owner approvals
//!
//! Tracks which owners currently approve which proposal. A confirmation
//! that brings the count up to quorum is reported as such, so the caller
//! can decide whether to execute in the same call. Counts never exceed the
//! owner count because only owners are recorded, each at most once.

use crate::state::WalletState;
use chrono::{DateTime, Utc};
use custody_types::{CustodyError, CustodyResult, OwnerId, ProposalId, WalletEventKind};
use tracing::{debug, info, warn};

/// Confirmation count after a confirm or revoke
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationChange {
    pub proposal_id: ProposalId,
    pub confirmations: u32,
    /// This change took the count from below quorum to exactly quorum
    pub quorum_reached: bool,
}

/// Records and withdraws owner confirmations
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfirmationTracker;

impl ConfirmationTracker {
    pub fn new() -> Self {
        Self
    }

    /// Record `caller`'s approval of proposal `id`
    pub(crate) fn confirm(
        &self,
        state: &mut WalletState,
        caller: &OwnerId,
        id: ProposalId,
        now: DateTime<Utc>,
    ) -> CustodyResult<ConfirmationChange> {
        state.registry.ensure_owner(caller).inspect_err(|_| {
            warn!(caller = %caller, proposal_id = %id, "Confirmation rejected: not an owner");
        })?;

        let proposal = state.store.get_mut(id)?;
        proposal.ensure_open(now)?;

        if !proposal.add_confirmation(caller.clone(), now) {
            return Err(CustodyError::AlreadyConfirmed {
                proposal_id: id,
                owner: caller.clone(),
            });
        }

        let quorum = state.registry.quorum();
        let confirmations = proposal.confirmation_count();
        let quorum_reached = confirmations == quorum;

        state.journal.record(
            Some(caller.clone()),
            WalletEventKind::Confirmed {
                proposal_id: id,
                confirmations,
            },
            now,
        );

        if quorum_reached {
            info!(
                proposal_id = %id,
                confirmations = confirmations,
                quorum = quorum,
                "Proposal reached quorum"
            );
        } else {
            debug!(
                proposal_id = %id,
                owner = %caller,
                confirmations = confirmations,
                quorum = quorum,
                "Confirmation recorded"
            );
        }

        Ok(ConfirmationChange {
            proposal_id: id,
            confirmations,
            quorum_reached,
        })
    }

    /// Withdraw `caller`'s approval of proposal `id`
    pub(crate) fn revoke(
        &self,
        state: &mut WalletState,
        caller: &OwnerId,
        id: ProposalId,
        now: DateTime<Utc>,
    ) -> CustodyResult<ConfirmationChange> {
        state.registry.ensure_owner(caller).inspect_err(|_| {
            warn!(caller = %caller, proposal_id = %id, "Revocation rejected: not an owner");
        })?;

        let proposal = state.store.get_mut(id)?;
        proposal.ensure_open(now)?;

        if !proposal.remove_confirmation(caller) {
            return Err(CustodyError::NotConfirmed {
                proposal_id: id,
                owner: caller.clone(),
            });
        }

        let confirmations = proposal.confirmation_count();
        state.journal.record(
            Some(caller.clone()),
            WalletEventKind::Revoked {
                proposal_id: id,
                confirmations,
            },
            now,
        );

        debug!(
            proposal_id = %id,
            owner = %caller,
            confirmations = confirmations,
            "Confirmation revoked"
        );

        Ok(ConfirmationChange {
            proposal_id: id,
            confirmations,
            quorum_reached: false,
        })
    }
}
