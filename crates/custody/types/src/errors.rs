//! Error types for custody operations

use crate::{OwnerId, ProposalId, TargetId};
use serde::{Deserialize, Serialize};

/// Errors that can occur in custody operations
///
/// Every operation is all-or-nothing: when one of these is returned, no
/// confirmation, flag or balance change from that call has been kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CustodyError {
    #[error("Not an owner: {0}")]
    NotOwner(OwnerId),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid target: '{0}'")]
    InvalidTarget(TargetId),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Proposal not found: {0}")]
    NotFound(ProposalId),

    #[error("Proposal already executed: {0}")]
    AlreadyExecuted(ProposalId),

    #[error("Proposal {proposal_id} already confirmed by {owner}")]
    AlreadyConfirmed {
        proposal_id: ProposalId,
        owner: OwnerId,
    },

    #[error("Proposal {proposal_id} not confirmed by {owner}")]
    NotConfirmed {
        proposal_id: ProposalId,
        owner: OwnerId,
    },

    #[error("Proposal expired: {0}")]
    ProposalExpired(ProposalId),

    #[error("Insufficient confirmations: required {required}, have {current}")]
    InsufficientConfirmations { required: u32, current: u32 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Dispatch of proposal {proposal_id} failed: {reason}")]
    DispatchFailed {
        proposal_id: ProposalId,
        reason: String,
    },

    #[error(
        "Dispatch of proposal {proposal_id} failed ({dispatch}) and its refund was refused ({refund})"
    )]
    RefundFailed {
        proposal_id: ProposalId,
        dispatch: String,
        refund: String,
    },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Broad failure classes callers can branch on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Caller is not a recognized owner
    Authorization,
    /// Malformed input at construction, submission or restore
    Validation,
    /// Operation incompatible with the proposal's current state
    StateConflict,
    /// Not enough confirmations or funds at execution time
    Resource,
    /// The target refused or failed the dispatched effect
    External,
}

impl CustodyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CustodyError::NotOwner(_) => ErrorClass::Authorization,
            CustodyError::InvalidConfiguration(_)
            | CustodyError::InvalidTarget(_)
            | CustodyError::InvalidAction(_)
            | CustodyError::CorruptSnapshot(_) => ErrorClass::Validation,
            CustodyError::NotFound(_)
            | CustodyError::AlreadyExecuted(_)
            | CustodyError::AlreadyConfirmed { .. }
            | CustodyError::NotConfirmed { .. }
            | CustodyError::ProposalExpired(_) => ErrorClass::StateConflict,
            CustodyError::InsufficientConfirmations { .. }
            | CustodyError::InsufficientBalance { .. }
            | CustodyError::Ledger(_) => ErrorClass::Resource,
            CustodyError::DispatchFailed { .. } | CustodyError::RefundFailed { .. } => {
                ErrorClass::External
            }
        }
    }

    /// Whether the same call could succeed later without anyone
    /// changing the proposal itself (more funds, more confirmations, a
    /// target that stops refusing). A refused refund needs an operator.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, CustodyError::RefundFailed { .. })
            && matches!(self.class(), ErrorClass::Resource | ErrorClass::External)
    }
}

/// Result type alias for custody operations
pub type CustodyResult<T> = Result<T, CustodyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            CustodyError::NotOwner(OwnerId::new("mallory")).class(),
            ErrorClass::Authorization
        );
        assert_eq!(
            CustodyError::InvalidTarget(TargetId::null()).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            CustodyError::AlreadyExecuted(ProposalId::new(0)).class(),
            ErrorClass::StateConflict
        );
        assert_eq!(
            CustodyError::InsufficientBalance {
                required: 10,
                available: 5
            }
            .class(),
            ErrorClass::Resource
        );
        assert_eq!(
            CustodyError::DispatchFailed {
                proposal_id: ProposalId::new(1),
                reason: "refused".into()
            }
            .class(),
            ErrorClass::External
        );
    }

    #[test]
    fn test_retriable() {
        assert!(CustodyError::InsufficientConfirmations {
            required: 2,
            current: 1
        }
        .is_retriable());
        assert!(!CustodyError::AlreadyExecuted(ProposalId::new(0)).is_retriable());
        assert!(!CustodyError::NotOwner(OwnerId::new("x")).is_retriable());

        let stranded = CustodyError::RefundFailed {
            proposal_id: ProposalId::new(2),
            dispatch: "refused".into(),
            refund: "ledger offline".into(),
        };
        assert_eq!(stranded.class(), ErrorClass::External);
        assert!(!stranded.is_retriable());
    }

    #[test]
    fn test_messages() {
        let err = CustodyError::AlreadyConfirmed {
            proposal_id: ProposalId::new(4),
            owner: OwnerId::new("bob"),
        };
        assert_eq!(err.to_string(), "Proposal 4 already confirmed by bob");
    }
}
