//! Actions: the closed set of effects an executed proposal may perform
//!
//! Proposals never carry free-form call data. A target either receives
//! value ([`Action::Transfer`]) or is asked to run a named action with
//! an argument blob it is expected to understand ([`Action::Invoke`]).

use crate::{Amount, ProposalId, TargetId};
use serde::{Deserialize, Serialize};

/// What an executed proposal does to its target
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Move the proposal's value to the target
    #[default]
    Transfer,
    /// Invoke a named action on the target, passing the value along
    Invoke {
        /// Name of the action on the target
        method: String,
        /// Encoded arguments, interpreted by the target only
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<u8>,
    },
}

impl Action {
    pub fn invoke(method: impl Into<String>, args: Vec<u8>) -> Self {
        Self::Invoke {
            method: method.into(),
            args,
        }
    }

    /// Short label used in logs and events
    pub fn label(&self) -> &str {
        match self {
            Action::Transfer => "transfer",
            Action::Invoke { method, .. } => method,
        }
    }

    /// Reason the action is malformed, if it is
    pub fn validation_error(&self) -> Option<String> {
        match self {
            Action::Transfer => None,
            Action::Invoke { method, .. } if method.trim().is_empty() => {
                Some("invoke action requires a method name".into())
            }
            Action::Invoke { .. } => None,
        }
    }
}

/// The external effect handed to a target invoker when a proposal executes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Proposal being executed
    pub proposal_id: ProposalId,
    /// Receiving target
    pub target: TargetId,
    /// Value debited from the wallet for this dispatch
    pub value: Amount,
    /// Action to perform on the target
    pub action: Action,
}
