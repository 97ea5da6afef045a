//! Proposal Store: append-only record of submitted transactions
//!
//! Submitting only records intent: there is no balance check and no
//! execution here. Ids are assigned sequentially from 0 and never reused;
//! proposals are never removed.

use crate::owner_registry::OwnerRegistry;
use chrono::{DateTime, Utc};
use custody_types::{
    Action, Amount, CustodyError, CustodyResult, EventJournal, OwnerId, Proposal, ProposalId,
    ProposalState, TargetId, WalletEventKind,
};
use tracing::{info, warn};

/// The fixed part of a proposal, as given by the submitting owner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDraft {
    pub target: TargetId,
    pub value: Amount,
    pub action: Action,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ProposalDraft {
    pub fn new(target: TargetId, value: Amount, action: Action) -> Self {
        Self {
            target,
            value,
            action,
            expires_at: None,
        }
    }

    pub fn transfer(target: TargetId, value: Amount) -> Self {
        Self::new(target, value, Action::Transfer)
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.expires_at = deadline;
        self
    }
}

/// Proposals indexed by id
#[derive(Clone, Debug, Default)]
pub struct ProposalStore {
    proposals: Vec<Proposal>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from proposals whose ids are already known to be
    /// sequential
    pub(crate) fn from_proposals(proposals: Vec<Proposal>) -> Self {
        Self { proposals }
    }

    /// Record a new pending proposal and return its id
    pub fn submit(
        &mut self,
        registry: &OwnerRegistry,
        journal: &mut EventJournal,
        caller: &OwnerId,
        draft: ProposalDraft,
        now: DateTime<Utc>,
    ) -> CustodyResult<ProposalId> {
        registry.ensure_owner(caller).inspect_err(|_| {
            warn!(caller = %caller, "Submission rejected: not an owner");
        })?;

        if draft.target.is_null() {
            return Err(CustodyError::InvalidTarget(draft.target));
        }

        if let Some(reason) = draft.action.validation_error() {
            return Err(CustodyError::InvalidAction(reason));
        }

        let id = self.next_id();
        let mut proposal = Proposal::new(
            id,
            caller.clone(),
            draft.target,
            draft.value,
            draft.action,
            now,
        );
        if let Some(deadline) = draft.expires_at {
            proposal = proposal.with_deadline(deadline);
        }

        journal.record(
            Some(caller.clone()),
            WalletEventKind::Submitted {
                proposal_id: id,
                target: proposal.target.clone(),
                value: proposal.value,
            },
            now,
        );

        info!(
            proposal_id = %id,
            proposer = %caller,
            target = %proposal.target,
            value = proposal.value.value(),
            action = proposal.action.label(),
            "Proposal submitted"
        );

        self.proposals.push(proposal);
        Ok(id)
    }

    /// Fails `NotFound` if the id was never issued
    pub fn get(&self, id: ProposalId) -> CustodyResult<&Proposal> {
        id.index()
            .and_then(|index| self.proposals.get(index))
            .ok_or(CustodyError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ProposalId) -> CustodyResult<&mut Proposal> {
        id.index()
            .and_then(|index| self.proposals.get_mut(index))
            .ok_or(CustodyError::NotFound(id))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Proposal> {
        self.proposals.iter_mut()
    }

    pub fn next_id(&self) -> ProposalId {
        ProposalId::new(self.proposals.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    pub fn count_in_state(&self, state: ProposalState) -> usize {
        self.proposals.iter().filter(|p| p.state == state).count()
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_types::WalletConfig;

    fn setup() -> (ProposalStore, OwnerRegistry, EventJournal) {
        let registry = OwnerRegistry::new(WalletConfig::new(
            vec![OwnerId::new("a"), OwnerId::new("b")],
            2,
        ))
        .unwrap();
        (ProposalStore::new(), registry, EventJournal::new())
    }

    #[test]
    fn test_sequential_ids() {
        let (mut store, registry, mut journal) = setup();
        let a = OwnerId::new("a");

        for expected in 0..3 {
            let id = store
                .submit(
                    &registry,
                    &mut journal,
                    &a,
                    ProposalDraft::transfer(TargetId::new("x"), Amount::new(1)),
                    Utc::now(),
                )
                .unwrap();
            assert_eq!(id, ProposalId::new(expected));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(journal.len(), 3);
    }

    #[test]
    fn test_new_proposal_is_pending_and_unconfirmed() {
        let (mut store, registry, mut journal) = setup();
        let id = store
            .submit(
                &registry,
                &mut journal,
                &OwnerId::new("b"),
                ProposalDraft::transfer(TargetId::new("x"), Amount::new(1_000_000)),
                Utc::now(),
            )
            .unwrap();

        let proposal = store.get(id).unwrap();
        assert!(proposal.is_pending());
        assert_eq!(proposal.confirmation_count(), 0);
        assert_eq!(proposal.proposer, OwnerId::new("b"));
    }

    #[test]
    fn test_rejects_non_owner() {
        let (mut store, registry, mut journal) = setup();
        let err = store
            .submit(
                &registry,
                &mut journal,
                &OwnerId::new("mallory"),
                ProposalDraft::transfer(TargetId::new("x"), Amount::new(1)),
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(err, CustodyError::NotOwner(OwnerId::new("mallory")));
        assert!(store.is_empty());
        assert!(journal.is_empty());
    }

    #[test]
    fn test_rejects_null_target() {
        let (mut store, registry, mut journal) = setup();
        let err = store
            .submit(
                &registry,
                &mut journal,
                &OwnerId::new("a"),
                ProposalDraft::transfer(TargetId::new("0x0000"), Amount::new(1)),
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, CustodyError::InvalidTarget(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_rejects_malformed_action() {
        let (mut store, registry, mut journal) = setup();
        let err = store
            .submit(
                &registry,
                &mut journal,
                &OwnerId::new("a"),
                ProposalDraft::new(TargetId::new("x"), Amount::zero(), Action::invoke("", vec![])),
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, CustodyError::InvalidAction(_)));
    }

    #[test]
    fn test_unknown_id() {
        let (store, _, _) = setup();
        assert_eq!(
            store.get(ProposalId::new(0)).unwrap_err(),
            CustodyError::NotFound(ProposalId::new(0))
        );
    }

    #[test]
    fn test_ids_past_the_address_space_are_not_found() {
        let (mut store, registry, mut journal) = setup();
        store
            .submit(
                &registry,
                &mut journal,
                &OwnerId::new("a"),
                ProposalDraft::transfer(TargetId::new("x"), Amount::new(1)),
                Utc::now(),
            )
            .unwrap();

        // Would alias proposal 0 if truncated to 32 bits
        for raw in [1u64 << 32, u64::MAX] {
            let id = ProposalId::new(raw);
            assert_eq!(store.get(id).unwrap_err(), CustodyError::NotFound(id));
            assert_eq!(store.get_mut(id).unwrap_err(), CustodyError::NotFound(id));
        }
        assert!(store.get(ProposalId::new(0)).is_ok());
    }
}
