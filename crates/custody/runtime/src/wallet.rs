//! Multisig Wallet: the single lock boundary around one wallet
//!
//! Every call takes the wallet's reentrant lock for its whole duration, so
//! calls on one wallet are linearised exactly as if they came from a serial
//! operation log. The lock is reentrant only so that a dispatched target
//! running on the same thread can call back in; such a nested call observes
//! the executing proposal as already `Executed`.

use crate::clock::{Clock, SystemClock};
use crate::confirmation_tracker::ConfirmationTracker;
use crate::dispatch::TargetInvoker;
use crate::execution_engine::ExecutionEngine;
use crate::ledger::BalanceLedger;
use crate::owner_registry::OwnerRegistry;
use crate::proposal_store::{ProposalDraft, ProposalStore};
use crate::query::{ProposalFilter, QueryFacade};
use crate::state::WalletState;
use chrono::{DateTime, Utc};
use custody_types::{
    Action, Amount, ConfirmOutcome, CustodyError, CustodyResult, ExecutionOutcome,
    ExecutionReceipt, ExecutionSettings, Operation, OperationOutcome, OwnerId, Proposal,
    ProposalId, TargetId, WalletConfig, WalletEvent, WalletEventKind, WalletSnapshot,
};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A shared balance controlled by a fixed owner set and quorum
pub struct MultisigWallet {
    registry: Arc<OwnerRegistry>,
    state: ReentrantMutex<RefCell<WalletState>>,
    tracker: ConfirmationTracker,
    engine: ExecutionEngine,
    settings: ExecutionSettings,
    clock: Arc<dyn Clock>,
}

impl MultisigWallet {
    /// Create a wallet with default settings: auto-execution on quorum,
    /// no proposal expiry, wall-clock time
    pub fn new(
        config: WalletConfig,
        ledger: Box<dyn BalanceLedger>,
        invoker: Arc<dyn TargetInvoker>,
    ) -> CustodyResult<Self> {
        let registry = Arc::new(OwnerRegistry::new(config)?);

        info!(
            owners = registry.owner_count(),
            quorum = registry.quorum(),
            "Multisig wallet created"
        );

        Ok(Self::assemble(
            WalletState::new(registry, ledger),
            invoker,
            ExecutionSettings::default(),
        ))
    }

    /// Rebuild a wallet from a snapshot, re-checking every invariant first
    #[instrument(skip_all, fields(proposals = snapshot.proposals.len()))]
    pub fn restore(
        snapshot: WalletSnapshot,
        ledger: Box<dyn BalanceLedger>,
        invoker: Arc<dyn TargetInvoker>,
    ) -> CustodyResult<Self> {
        snapshot.validate().inspect_err(|e| {
            warn!(error = %e, "Snapshot rejected");
        })?;

        let registry = Arc::new(
            OwnerRegistry::new(snapshot.config())
                .map_err(|e| CustodyError::CorruptSnapshot(e.to_string()))?,
        );
        let state = WalletState {
            registry,
            store: ProposalStore::from_proposals(snapshot.proposals),
            ledger,
            journal: snapshot.journal,
        };

        info!(
            proposals = state.store.len(),
            events = state.journal.len(),
            "Multisig wallet restored"
        );

        Ok(Self::assemble(state, invoker, snapshot.settings))
    }

    fn assemble(
        state: WalletState,
        invoker: Arc<dyn TargetInvoker>,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            registry: Arc::clone(&state.registry),
            state: ReentrantMutex::new(RefCell::new(state)),
            tracker: ConfirmationTracker::new(),
            engine: ExecutionEngine::new(invoker),
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Record a new pending proposal. Nothing is checked against the
    /// balance until execution.
    pub fn submit(
        &self,
        caller: &OwnerId,
        target: TargetId,
        value: Amount,
        action: Action,
    ) -> CustodyResult<ProposalId> {
        let guard = self.state.lock();
        let now = self.now();
        let deadline = self
            .settings
            .proposal_ttl()
            .and_then(|ttl| now.checked_add_signed(ttl));
        let draft = ProposalDraft::new(target, value, action).with_deadline(deadline);

        let mut state = guard.borrow_mut();
        let state = &mut *state;
        state
            .store
            .submit(&state.registry, &mut state.journal, caller, draft, now)
    }

    /// Record `caller`'s confirmation. Under auto-execution, the
    /// confirmation that reaches quorum also attempts execution; a failed
    /// attempt keeps the confirmation and is reported in the outcome.
    pub fn confirm(&self, caller: &OwnerId, id: ProposalId) -> CustodyResult<ConfirmOutcome> {
        let guard = self.state.lock();
        let now = self.now();
        let change = self
            .tracker
            .confirm(&mut guard.borrow_mut(), caller, id, now)?;

        let execution = if change.quorum_reached && self.settings.auto_executes() {
            match self.engine.execute(&guard, caller, id, now) {
                Ok(receipt) => ExecutionOutcome::Executed(receipt),
                Err(err) => {
                    debug!(proposal_id = %id, error = %err, "Automatic execution did not complete");
                    ExecutionOutcome::Failed(err)
                }
            }
        } else {
            ExecutionOutcome::NotAttempted
        };

        Ok(ConfirmOutcome {
            proposal_id: id,
            confirmations: change.confirmations,
            quorum_reached: change.quorum_reached,
            execution,
        })
    }

    /// Withdraw `caller`'s confirmation and return the new count
    pub fn revoke(&self, caller: &OwnerId, id: ProposalId) -> CustodyResult<u32> {
        let guard = self.state.lock();
        let now = self.now();
        let change = self
            .tracker
            .revoke(&mut guard.borrow_mut(), caller, id, now)?;
        Ok(change.confirmations)
    }

    /// Execute a proposal that has quorum. Any owner may call this, under
    /// either policy.
    pub fn execute(&self, caller: &OwnerId, id: ProposalId) -> CustodyResult<ExecutionReceipt> {
        let guard = self.state.lock();
        let now = self.now();
        self.engine.execute(&guard, caller, id, now)
    }

    /// Credit the shared balance and return the new balance. Anyone may
    /// fund the wallet.
    pub fn deposit(&self, amount: Amount) -> CustodyResult<Amount> {
        let guard = self.state.lock();
        let now = self.now();
        let mut state = guard.borrow_mut();

        state.ledger.credit(amount)?;
        let balance = state.ledger.balance();
        state
            .journal
            .record(None, WalletEventKind::Deposited { amount }, now);

        info!(
            amount = amount.value(),
            balance = balance.value(),
            "Deposit received"
        );
        Ok(balance)
    }

    /// Move every pending proposal past its deadline to `Expired`.
    /// Returns the ids that changed.
    pub fn expire_stale(&self, caller: &OwnerId) -> CustodyResult<Vec<ProposalId>> {
        self.registry.ensure_owner(caller)?;

        let guard = self.state.lock();
        let now = self.now();
        let mut state = guard.borrow_mut();
        let state = &mut *state;

        let mut expired = Vec::new();
        for proposal in state.store.iter_mut().filter(|p| p.is_stale(now)) {
            proposal.mark_expired();
            state.journal.record(
                Some(caller.clone()),
                WalletEventKind::Expired {
                    proposal_id: proposal.id,
                },
                now,
            );
            expired.push(proposal.id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), caller = %caller, "Stale proposals expired");
        }
        Ok(expired)
    }

    /// Run one entry of a serial operation log
    pub fn apply(&self, operation: Operation) -> CustodyResult<OperationOutcome> {
        debug!(op = operation.name(), "Applying operation");

        match operation {
            Operation::Submit {
                caller,
                target,
                value,
                action,
            } => self
                .submit(&caller, target, value, action)
                .map(|proposal_id| OperationOutcome::Submitted { proposal_id }),
            Operation::Confirm {
                caller,
                proposal_id,
            } => self
                .confirm(&caller, proposal_id)
                .map(OperationOutcome::Confirmed),
            Operation::Revoke {
                caller,
                proposal_id,
            } => self
                .revoke(&caller, proposal_id)
                .map(|confirmations| OperationOutcome::Revoked {
                    proposal_id,
                    confirmations,
                }),
            Operation::Execute {
                caller,
                proposal_id,
            } => self
                .execute(&caller, proposal_id)
                .map(OperationOutcome::Executed),
            Operation::Deposit { amount } => self
                .deposit(amount)
                .map(|balance| OperationOutcome::Deposited { balance }),
            Operation::ExpireStale { caller } => self
                .expire_stale(&caller)
                .map(|proposal_ids| OperationOutcome::Expired { proposal_ids }),
        }
    }

    /// Serializable copy of the wallet's state. The balance is not
    /// included; it belongs to the ledger.
    pub fn snapshot(&self) -> WalletSnapshot {
        let guard = self.state.lock();
        let state = guard.borrow();
        WalletSnapshot {
            owners: self.registry.list_owners().to_vec(),
            quorum: self.registry.quorum(),
            settings: self.settings.clone(),
            proposals: state.store.proposals().to_vec(),
            journal: state.journal.clone(),
            taken_at: self.now(),
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Run `f` against a consistent view of the wallet.
    ///
    /// `f` must not call back into this wallet.
    pub fn read<R>(&self, f: impl FnOnce(&QueryFacade<'_>) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&QueryFacade::new(&state))
    }

    pub fn list_owners(&self) -> &[OwnerId] {
        self.registry.list_owners()
    }

    pub fn is_owner(&self, principal: &OwnerId) -> bool {
        self.registry.is_owner(principal)
    }

    pub fn quorum(&self) -> u32 {
        self.registry.quorum()
    }

    pub fn config(&self) -> WalletConfig {
        self.registry.config()
    }

    pub fn proposal_count(&self) -> usize {
        self.read(|q| q.proposal_count())
    }

    pub fn get_proposal(&self, id: ProposalId) -> CustodyResult<Proposal> {
        self.read(|q| q.get_proposal(id).cloned())
    }

    pub fn confirmation_count(&self, id: ProposalId) -> CustodyResult<u32> {
        self.read(|q| q.confirmation_count(id))
    }

    pub fn is_confirmed_by(&self, id: ProposalId, owner: &OwnerId) -> CustodyResult<bool> {
        self.read(|q| q.is_confirmed_by(id, owner))
    }

    pub fn confirmations(&self, id: ProposalId) -> CustodyResult<Vec<OwnerId>> {
        self.read(|q| q.confirmations(id))
    }

    pub fn list_proposals(&self, filter: &ProposalFilter) -> Vec<Proposal> {
        self.read(|q| q.list_proposals(filter).into_iter().cloned().collect())
    }

    pub fn pending_count(&self) -> usize {
        self.read(|q| q.pending_count())
    }

    pub fn executed_count(&self) -> usize {
        self.read(|q| q.executed_count())
    }

    pub fn balance(&self) -> Amount {
        self.read(|q| q.balance())
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.read(|q| q.events().to_vec())
    }
}

impl std::fmt::Debug for MultisigWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultisigWallet")
            .field("owners", &self.registry.list_owners())
            .field("quorum", &self.registry.quorum())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
