//! Operations and their outcomes
//!
//! [`Operation`] names every mutating wallet call so a wallet can be driven
//! from a serial log, one entry at a time.

use crate::{Action, Amount, CustodyError, OwnerId, ProposalId, TargetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single mutating call against a wallet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Submit {
        caller: OwnerId,
        target: TargetId,
        value: Amount,
        #[serde(default)]
        action: Action,
    },
    Confirm {
        caller: OwnerId,
        proposal_id: ProposalId,
    },
    Revoke {
        caller: OwnerId,
        proposal_id: ProposalId,
    },
    Execute {
        caller: OwnerId,
        proposal_id: ProposalId,
    },
    Deposit {
        amount: Amount,
    },
    ExpireStale {
        caller: OwnerId,
    },
}

impl Operation {
    /// Owner on whose behalf the operation runs; `None` for deposits
    pub fn caller(&self) -> Option<&OwnerId> {
        match self {
            Operation::Submit { caller, .. }
            | Operation::Confirm { caller, .. }
            | Operation::Revoke { caller, .. }
            | Operation::Execute { caller, .. }
            | Operation::ExpireStale { caller } => Some(caller),
            Operation::Deposit { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Submit { .. } => "submit",
            Operation::Confirm { .. } => "confirm",
            Operation::Revoke { .. } => "revoke",
            Operation::Execute { .. } => "execute",
            Operation::Deposit { .. } => "deposit",
            Operation::ExpireStale { .. } => "expire_stale",
        }
    }
}

/// Proof that a proposal executed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub proposal_id: ProposalId,
    pub target: TargetId,
    pub value: Amount,
    pub executed_at: DateTime<Utc>,
}

/// What happened to execution as part of a confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Quorum was not just reached, or the wallet requires explicit execution
    NotAttempted,
    /// Quorum was reached and the proposal executed in the same call
    Executed(ExecutionReceipt),
    /// Quorum was reached but execution failed; the proposal stays pending
    Failed(CustodyError),
}

/// Result of a successful confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub proposal_id: ProposalId,
    /// Confirmation count after this call
    pub confirmations: u32,
    /// This confirmation is the one that brought the count up to quorum
    pub quorum_reached: bool,
    pub execution: ExecutionOutcome,
}

impl ConfirmOutcome {
    pub fn executed(&self) -> bool {
        matches!(self.execution, ExecutionOutcome::Executed(_))
    }
}

/// Result of a successfully applied [`Operation`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OperationOutcome {
    Submitted {
        proposal_id: ProposalId,
    },
    Confirmed(ConfirmOutcome),
    Revoked {
        proposal_id: ProposalId,
        confirmations: u32,
    },
    Executed(ExecutionReceipt),
    Deposited {
        balance: Amount,
    },
    Expired {
        proposal_ids: Vec<ProposalId>,
    },
}
