//! Query Facade: read-only views of wallet state
//!
//! A [`QueryFacade`] borrows the state shared-only, so nothing reachable
//! from it can mutate the wallet.

use crate::state::WalletState;
use custody_types::{
    Amount, CustodyResult, OwnerId, Proposal, ProposalId, ProposalState, WalletEvent,
};
use serde::{Deserialize, Serialize};

/// Selects proposals for [`QueryFacade::list_proposals`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFilter {
    /// Only proposals in this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProposalState>,
    /// At most this many, lowest ids first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ProposalFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pending() -> Self {
        Self::in_state(ProposalState::Pending)
    }

    pub fn in_state(state: ProposalState) -> Self {
        Self {
            state: Some(state),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, proposal: &Proposal) -> bool {
        match self.state {
            Some(state) => proposal.state == state,
            None => true,
        }
    }
}

/// Read-only access to one wallet
pub struct QueryFacade<'a> {
    state: &'a WalletState,
}

impl<'a> QueryFacade<'a> {
    pub(crate) fn new(state: &'a WalletState) -> Self {
        Self { state }
    }

    pub fn list_owners(&self) -> &'a [OwnerId] {
        self.state.registry.list_owners()
    }

    pub fn is_owner(&self, principal: &OwnerId) -> bool {
        self.state.registry.is_owner(principal)
    }

    pub fn quorum(&self) -> u32 {
        self.state.registry.quorum()
    }

    pub fn proposal_count(&self) -> usize {
        self.state.store.len()
    }

    pub fn get_proposal(&self, id: ProposalId) -> CustodyResult<&'a Proposal> {
        self.state.store.get(id)
    }

    pub fn confirmation_count(&self, id: ProposalId) -> CustodyResult<u32> {
        Ok(self.get_proposal(id)?.confirmation_count())
    }

    /// False for non-owners; fails only for an unknown id
    pub fn is_confirmed_by(&self, id: ProposalId, owner: &OwnerId) -> CustodyResult<bool> {
        Ok(self.get_proposal(id)?.is_confirmed_by(owner))
    }

    /// Confirming owners in the order they confirmed
    pub fn confirmations(&self, id: ProposalId) -> CustodyResult<Vec<OwnerId>> {
        Ok(self.get_proposal(id)?.confirmers().cloned().collect())
    }

    pub fn list_proposals(&self, filter: &ProposalFilter) -> Vec<&'a Proposal> {
        let matching = self.state.store.iter().filter(|p| filter.matches(p));
        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.store.count_in_state(ProposalState::Pending)
    }

    pub fn executed_count(&self) -> usize {
        self.state.store.count_in_state(ProposalState::Executed)
    }

    pub fn balance(&self) -> Amount {
        self.state.ledger.balance()
    }

    pub fn events(&self) -> &'a [WalletEvent] {
        self.state.journal.events()
    }

    /// Events with a sequence number at or after `sequence`
    pub fn events_since(&self, sequence: u64) -> &'a [WalletEvent] {
        self.state.journal.since(sequence)
    }
}
