//! Proposals: recorded intents awaiting owner confirmation
//!
//! A proposal's target, value and action are fixed at submission. Only
//! its state and its confirmation set change afterwards, and both freeze
//! once the proposal leaves `Pending`.

use crate::{
    Action, Amount, CustodyError, CustodyResult, DispatchRequest, OwnerId, ProposalId, TargetId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Collecting confirmations
    #[default]
    Pending,
    /// Executed exactly once; terminal
    Executed,
    /// Deadline passed before execution; terminal
    Expired,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalState::Pending)
    }
}

impl std::fmt::Display for ProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProposalState::Pending => "pending",
            ProposalState::Executed => "executed",
            ProposalState::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// One owner's approval of one proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub owner: OwnerId,
    pub confirmed_at: DateTime<Utc>,
}

/// A submitted transaction and its confirmations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential identifier
    pub id: ProposalId,
    /// Owner who submitted the proposal
    pub proposer: OwnerId,
    /// Target receiving the value and/or action
    pub target: TargetId,
    /// Value debited from the wallet on execution
    pub value: Amount,
    /// Effect performed on the target
    pub action: Action,
    /// Current lifecycle state
    pub state: ProposalState,
    /// Confirmations in the order they were given, at most one per owner
    pub confirmations: Vec<Confirmation>,
    /// When the proposal was submitted
    pub created_at: DateTime<Utc>,
    /// Deadline for confirming and executing, if the wallet sets one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// When the proposal executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

impl Proposal {
    pub fn new(
        id: ProposalId,
        proposer: OwnerId,
        target: TargetId,
        value: Amount,
        action: Action,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            proposer,
            target,
            value,
            action,
            state: ProposalState::Pending,
            confirmations: Vec::new(),
            created_at,
            expires_at: None,
            executed_at: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.expires_at = Some(deadline);
        self
    }

    pub fn is_executed(&self) -> bool {
        self.state == ProposalState::Executed
    }

    pub fn is_pending(&self) -> bool {
        self.state == ProposalState::Pending
    }

    /// Pending, but past its deadline
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expires_at.is_some_and(|deadline| now > deadline)
    }

    /// Fail unless the proposal can still be confirmed, revoked or executed
    pub fn ensure_open(&self, now: DateTime<Utc>) -> CustodyResult<()> {
        match self.state {
            ProposalState::Executed => Err(CustodyError::AlreadyExecuted(self.id)),
            ProposalState::Expired => Err(CustodyError::ProposalExpired(self.id)),
            ProposalState::Pending if self.is_stale(now) => {
                Err(CustodyError::ProposalExpired(self.id))
            }
            ProposalState::Pending => Ok(()),
        }
    }

    pub fn confirmation_count(&self) -> u32 {
        self.confirmations.len() as u32
    }

    pub fn is_confirmed_by(&self, owner: &OwnerId) -> bool {
        self.confirmations.iter().any(|c| &c.owner == owner)
    }

    pub fn confirmers(&self) -> impl Iterator<Item = &OwnerId> {
        self.confirmations.iter().map(|c| &c.owner)
    }

    pub fn has_quorum(&self, quorum: u32) -> bool {
        self.confirmation_count() >= quorum
    }

    /// Record a confirmation. Returns false if the owner already confirmed.
    pub fn add_confirmation(&mut self, owner: OwnerId, at: DateTime<Utc>) -> bool {
        if self.is_confirmed_by(&owner) {
            return false;
        }
        self.confirmations.push(Confirmation {
            owner,
            confirmed_at: at,
        });
        true
    }

    /// Drop a confirmation. Returns false if the owner had not confirmed.
    pub fn remove_confirmation(&mut self, owner: &OwnerId) -> bool {
        let before = self.confirmations.len();
        self.confirmations.retain(|c| &c.owner != owner);
        self.confirmations.len() != before
    }

    pub fn mark_executed(&mut self, at: DateTime<Utc>) {
        self.state = ProposalState::Executed;
        self.executed_at = Some(at);
    }

    /// Undo [`Proposal::mark_executed`] after the dispatch it guarded failed.
    /// Only valid while the executing call still holds the wallet lock.
    pub fn rollback_execution(&mut self) {
        self.state = ProposalState::Pending;
        self.executed_at = None;
    }

    pub fn mark_expired(&mut self) {
        self.state = ProposalState::Expired;
    }

    pub fn dispatch_request(&self) -> DispatchRequest {
        DispatchRequest {
            proposal_id: self.id,
            target: self.target.clone(),
            value: self.value,
            action: self.action.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal::new(
            ProposalId::new(0),
            OwnerId::new("alice"),
            TargetId::new("vendor"),
            Amount::new(10),
            Action::Transfer,
            Utc::now(),
        )
    }

    #[test]
    fn test_confirmation_set_semantics() {
        let mut p = proposal();
        let now = Utc::now();

        assert!(p.add_confirmation(OwnerId::new("alice"), now));
        assert!(!p.add_confirmation(OwnerId::new("alice"), now));
        assert!(p.add_confirmation(OwnerId::new("bob"), now));
        assert_eq!(p.confirmation_count(), 2);
        assert!(p.has_quorum(2));

        assert!(p.remove_confirmation(&OwnerId::new("alice")));
        assert!(!p.remove_confirmation(&OwnerId::new("alice")));
        assert_eq!(
            p.confirmers().cloned().collect::<Vec<_>>(),
            vec![OwnerId::new("bob")]
        );
    }

    #[test]
    fn test_ensure_open() {
        let now = Utc::now();
        let mut p = proposal();
        assert!(p.ensure_open(now).is_ok());

        p.mark_executed(now);
        assert_eq!(
            p.ensure_open(now),
            Err(CustodyError::AlreadyExecuted(ProposalId::new(0)))
        );

        p.rollback_execution();
        assert!(p.is_pending());
        assert!(p.executed_at.is_none());
    }

    #[test]
    fn test_deadline() {
        let now = Utc::now();
        let p = proposal().with_deadline(now);

        assert!(!p.is_stale(now));
        assert!(p.is_stale(now + chrono::Duration::seconds(1)));
        assert_eq!(
            p.ensure_open(now + chrono::Duration::seconds(1)),
            Err(CustodyError::ProposalExpired(ProposalId::new(0)))
        );
    }

    #[test]
    fn test_executed_is_not_stale() {
        let now = Utc::now();
        let mut p = proposal().with_deadline(now);
        p.mark_executed(now);
        assert!(!p.is_stale(now + chrono::Duration::days(1)));
    }
}
