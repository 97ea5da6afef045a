//! Execution Engine: performs a proposal once it has quorum
//!
//! Ordering is checks, then effects, then the external call:
//!
//! 1. Caller, proposal state, confirmations and balance are checked.
//! 2. The proposal is marked `Executed` and the ledger is debited.
//! 3. The state borrow is released and the target is invoked.
//!
//! A target that re-enters the wallet during step 3 sees a terminal
//! proposal. If the target refuses, the debit is refunded and the proposal
//! goes back to `Pending` with its confirmations intact. If the ledger also
//! refuses the refund, the proposal stays `Executed` so the debit can never
//! be taken twice, and the call fails `RefundFailed`.

use crate::dispatch::TargetInvoker;
use crate::state::WalletState;
use chrono::{DateTime, Utc};
use custody_types::{
    CustodyError, CustodyResult, DispatchRequest, ExecutionReceipt, OwnerId, ProposalId,
    WalletEventKind,
};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Executes proposals against the wallet's ledger and target invoker
pub struct ExecutionEngine {
    invoker: Arc<dyn TargetInvoker>,
}

impl ExecutionEngine {
    pub fn new(invoker: Arc<dyn TargetInvoker>) -> Self {
        Self { invoker }
    }

    /// Execute proposal `id` on behalf of `caller`.
    ///
    /// Must be called with the wallet lock held and no outstanding borrow
    /// of `cell`.
    pub(crate) fn execute(
        &self,
        cell: &RefCell<WalletState>,
        caller: &OwnerId,
        id: ProposalId,
        now: DateTime<Utc>,
    ) -> CustodyResult<ExecutionReceipt> {
        let request = self.commit(&mut cell.borrow_mut(), caller, id, now)?;

        match self.invoker.invoke(&request) {
            Ok(()) => {
                cell.borrow_mut().journal.record(
                    Some(caller.clone()),
                    WalletEventKind::Executed {
                        proposal_id: id,
                        value: request.value,
                    },
                    now,
                );

                info!(
                    proposal_id = %id,
                    target = %request.target,
                    value = request.value.value(),
                    action = request.action.label(),
                    "Proposal executed"
                );

                Ok(ExecutionReceipt {
                    proposal_id: id,
                    target: request.target,
                    value: request.value,
                    executed_at: now,
                })
            }
            Err(dispatch_err) => Err(self.roll_back(
                &mut cell.borrow_mut(),
                caller,
                &request,
                dispatch_err.to_string(),
                now,
            )),
        }
    }

    /// Checks and effects. Leaves the proposal `Executed` and the ledger
    /// debited, or changes nothing but the journal.
    fn commit(
        &self,
        state: &mut WalletState,
        caller: &OwnerId,
        id: ProposalId,
        now: DateTime<Utc>,
    ) -> CustodyResult<DispatchRequest> {
        state.registry.ensure_owner(caller).inspect_err(|_| {
            warn!(caller = %caller, proposal_id = %id, "Execution rejected: not an owner");
        })?;

        let quorum = state.registry.quorum();
        let proposal = state.store.get_mut(id)?;
        proposal.ensure_open(now).inspect_err(|e| {
            warn!(proposal_id = %id, error = %e, "Execution rejected");
        })?;

        let current = proposal.confirmation_count();
        if current < quorum {
            warn!(
                proposal_id = %id,
                confirmations = current,
                quorum = quorum,
                "Execution rejected: quorum not reached"
            );
            return Err(CustodyError::InsufficientConfirmations {
                required: quorum,
                current,
            });
        }

        let available = state.ledger.balance();
        if proposal.value > available {
            let err = CustodyError::InsufficientBalance {
                required: proposal.value.value(),
                available: available.value(),
            };
            warn!(proposal_id = %id, error = %err, "Execution failed");
            state.journal.record(
                Some(caller.clone()),
                WalletEventKind::ExecutionFailed {
                    proposal_id: id,
                    reason: err.to_string(),
                },
                now,
            );
            return Err(err);
        }

        proposal.mark_executed(now);

        if let Err(ledger_err) = state.ledger.debit(proposal.value) {
            proposal.rollback_execution();
            let err = CustodyError::from(ledger_err);
            warn!(proposal_id = %id, error = %err, "Execution failed: ledger refused debit");
            state.journal.record(
                Some(caller.clone()),
                WalletEventKind::ExecutionFailed {
                    proposal_id: id,
                    reason: err.to_string(),
                },
                now,
            );
            return Err(err);
        }

        Ok(proposal.dispatch_request())
    }

    /// Undo [`ExecutionEngine::commit`] after the target refused, and
    /// return the error the caller sees
    fn roll_back(
        &self,
        state: &mut WalletState,
        caller: &OwnerId,
        request: &DispatchRequest,
        reason: String,
        now: DateTime<Utc>,
    ) -> CustodyError {
        let id = request.proposal_id;

        if let Err(refund_err) = state.ledger.credit(request.value) {
            // Stays executed: the debit stands and must not be taken again
            let refund = refund_err.to_string();
            error!(
                proposal_id = %id,
                value = request.value.value(),
                dispatch = %reason,
                refund = %refund,
                "Dispatch failed and the refund was refused; proposal left executed"
            );
            state.journal.record(
                Some(caller.clone()),
                WalletEventKind::RefundFailed {
                    proposal_id: id,
                    value: request.value,
                    reason: format!("dispatch: {}; refund: {}", reason, refund),
                },
                now,
            );
            return CustodyError::RefundFailed {
                proposal_id: id,
                dispatch: reason,
                refund,
            };
        }

        // Nested calls made by the target cannot touch an executed proposal,
        // so it is still exactly as `commit` left it.
        if let Ok(proposal) = state.store.get_mut(id) {
            proposal.rollback_execution();
        }

        state.journal.record(
            Some(caller.clone()),
            WalletEventKind::ExecutionFailed {
                proposal_id: id,
                reason: reason.clone(),
            },
            now,
        );

        warn!(
            proposal_id = %id,
            target = %request.target,
            reason = %reason,
            "Dispatch failed, execution rolled back"
        );

        CustodyError::DispatchFailed {
            proposal_id: id,
            reason,
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation_tracker::ConfirmationTracker;
    use crate::dispatch::RecordingInvoker;
    use crate::ledger::{BalanceLedger, InMemoryLedger};
    use crate::owner_registry::OwnerRegistry;
    use crate::proposal_store::ProposalDraft;
    use custody_types::{Amount, ProposalState, TargetId, WalletConfig};

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name)
    }

    struct Fixture {
        cell: RefCell<WalletState>,
        invoker: Arc<RecordingInvoker>,
        engine: ExecutionEngine,
    }

    fn setup(balance: u64, value: u64) -> (Fixture, ProposalId) {
        let registry = OwnerRegistry::new(WalletConfig::new(
            vec![owner("a"), owner("b"), owner("c")],
            2,
        ))
        .unwrap();
        let mut state = WalletState::new(
            Arc::new(registry),
            Box::new(InMemoryLedger::with_balance(Amount::new(balance))),
        );
        let id = state
            .store
            .submit(
                &state.registry,
                &mut state.journal,
                &owner("a"),
                ProposalDraft::transfer(TargetId::new("vendor"), Amount::new(value)),
                Utc::now(),
            )
            .unwrap();

        let invoker = Arc::new(RecordingInvoker::new());
        let fixture = Fixture {
            cell: RefCell::new(state),
            engine: ExecutionEngine::new(invoker.clone()),
            invoker,
        };
        (fixture, id)
    }

    fn confirm(fixture: &Fixture, who: &str, id: ProposalId) {
        ConfirmationTracker::new()
            .confirm(&mut fixture.cell.borrow_mut(), &owner(who), id, Utc::now())
            .unwrap();
    }

    #[test]
    fn test_execute_with_quorum() {
        let (fx, id) = setup(100, 40);
        confirm(&fx, "a", id);
        confirm(&fx, "b", id);

        let receipt = fx.engine.execute(&fx.cell, &owner("c"), id, Utc::now()).unwrap();
        assert_eq!(receipt.value, Amount::new(40));

        let state = fx.cell.borrow();
        assert!(state.store.get(id).unwrap().is_executed());
        assert_eq!(state.ledger.balance(), Amount::new(60));
        assert_eq!(fx.invoker.dispatched().len(), 1);
    }

    #[test]
    fn test_execute_without_quorum() {
        let (fx, id) = setup(100, 40);
        confirm(&fx, "a", id);

        let err = fx
            .engine
            .execute(&fx.cell, &owner("a"), id, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            CustodyError::InsufficientConfirmations {
                required: 2,
                current: 1
            }
        );
        assert!(fx.invoker.dispatched().is_empty());
    }

    #[test]
    fn test_execute_twice() {
        let (fx, id) = setup(100, 40);
        confirm(&fx, "a", id);
        confirm(&fx, "b", id);

        fx.engine.execute(&fx.cell, &owner("a"), id, Utc::now()).unwrap();
        let err = fx
            .engine
            .execute(&fx.cell, &owner("b"), id, Utc::now())
            .unwrap_err();

        assert_eq!(err, CustodyError::AlreadyExecuted(id));
        assert_eq!(fx.cell.borrow().ledger.balance(), Amount::new(60));
        assert_eq!(fx.invoker.dispatched().len(), 1);
    }

    #[test]
    fn test_insufficient_balance_changes_nothing() {
        let (fx, id) = setup(10, 40);
        confirm(&fx, "a", id);
        confirm(&fx, "b", id);

        let err = fx
            .engine
            .execute(&fx.cell, &owner("a"), id, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            CustodyError::InsufficientBalance {
                required: 40,
                available: 10
            }
        );

        let state = fx.cell.borrow();
        let proposal = state.store.get(id).unwrap();
        assert_eq!(proposal.state, ProposalState::Pending);
        assert_eq!(proposal.confirmation_count(), 2);
        assert_eq!(state.ledger.balance(), Amount::new(10));
    }

    #[test]
    fn test_dispatch_failure_rolls_back() {
        let (fx, id) = setup(100, 40);
        confirm(&fx, "a", id);
        confirm(&fx, "b", id);
        fx.invoker.reject_target(TargetId::new("vendor"));

        let err = fx
            .engine
            .execute(&fx.cell, &owner("a"), id, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CustodyError::DispatchFailed { proposal_id, .. } if proposal_id == id));

        {
            let state = fx.cell.borrow();
            let proposal = state.store.get(id).unwrap();
            assert!(proposal.is_pending());
            assert!(proposal.executed_at.is_none());
            assert_eq!(proposal.confirmation_count(), 2);
            assert_eq!(state.ledger.balance(), Amount::new(100));
            assert!(matches!(
                state.journal.events().last().unwrap().kind,
                WalletEventKind::ExecutionFailed { .. }
            ));
        }

        // Retriable once the target accepts again
        fx.invoker.accept_target(&TargetId::new("vendor"));
        fx.engine.execute(&fx.cell, &owner("a"), id, Utc::now()).unwrap();
        assert_eq!(fx.cell.borrow().ledger.balance(), Amount::new(60));
    }

    #[test]
    fn test_non_owner_cannot_execute() {
        let (fx, id) = setup(100, 40);
        confirm(&fx, "a", id);
        confirm(&fx, "b", id);

        let err = fx
            .engine
            .execute(&fx.cell, &owner("mallory"), id, Utc::now())
            .unwrap_err();
        assert_eq!(err, CustodyError::NotOwner(owner("mallory")));
        assert!(fx.cell.borrow().store.get(id).unwrap().is_pending());
    }
}
