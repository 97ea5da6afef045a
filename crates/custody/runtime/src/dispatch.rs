//! Dispatch: handing an executed proposal's effect to its target
//!
//! The wallet has no opinion about what a target does with a
//! [`DispatchRequest`]. It only needs a yes or no: a refusal rolls the
//! execution back.

use custody_types::{DispatchRequest, TargetId};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Performs the external effect of an executed proposal
pub trait TargetInvoker: Send + Sync {
    fn invoke(&self, request: &DispatchRequest) -> Result<(), DispatchError>;
}

/// Dispatch errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Target rejected the call: {0}")]
    Rejected(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(TargetId),
}

/// Accepts every dispatch and keeps a copy of it, unless the target has
/// been marked as rejecting
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    dispatched: Mutex<Vec<DispatchRequest>>,
    rejecting: Mutex<HashSet<TargetId>>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future dispatch to `target` fail
    pub fn reject_target(&self, target: TargetId) {
        self.rejecting.lock().insert(target);
    }

    pub fn accept_target(&self, target: &TargetId) {
        self.rejecting.lock().remove(target);
    }

    /// Accepted dispatches, oldest first
    pub fn dispatched(&self) -> Vec<DispatchRequest> {
        self.dispatched.lock().clone()
    }

    /// Accepted dispatches, clearing the record
    pub fn take(&self) -> Vec<DispatchRequest> {
        std::mem::take(&mut *self.dispatched.lock())
    }
}

impl TargetInvoker for RecordingInvoker {
    fn invoke(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        if self.rejecting.lock().contains(&request.target) {
            return Err(DispatchError::Rejected(format!(
                "{} refuses {}",
                request.target,
                request.action.label()
            )));
        }
        self.dispatched.lock().push(request.clone());
        Ok(())
    }
}

/// Routes dispatches to the invoker registered for their target
#[derive(Default)]
pub struct DispatchRouter {
    routes: RwLock<HashMap<TargetId, Arc<dyn TargetInvoker>>>,
}

impl DispatchRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, target: TargetId, invoker: Arc<dyn TargetInvoker>) {
        debug!(target = %target, "Dispatch route registered");
        self.routes.write().insert(target, invoker);
    }

    pub fn is_routed(&self, target: &TargetId) -> bool {
        self.routes.read().contains_key(target)
    }
}

impl TargetInvoker for DispatchRouter {
    fn invoke(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        // The route is cloned out so the handler runs without the lock held;
        // handlers may re-enter the wallet and dispatch again.
        let route = self.routes.read().get(&request.target).cloned();
        match route {
            Some(invoker) => invoker.invoke(request),
            None => Err(DispatchError::UnknownTarget(request.target.clone())),
        }
    }
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut targets: Vec<_> = self.routes.read().keys().cloned().collect();
        targets.sort();
        f.debug_struct("DispatchRouter")
            .field("targets", &targets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_types::{Action, Amount, ProposalId};

    fn request(target: &str) -> DispatchRequest {
        DispatchRequest {
            proposal_id: ProposalId::new(0),
            target: TargetId::new(target),
            value: Amount::new(1),
            action: Action::Transfer,
        }
    }

    #[test]
    fn test_recording_invoker() {
        let invoker = RecordingInvoker::new();
        invoker.invoke(&request("vendor")).unwrap();

        invoker.reject_target(TargetId::new("vendor"));
        assert!(matches!(
            invoker.invoke(&request("vendor")),
            Err(DispatchError::Rejected(_))
        ));

        invoker.accept_target(&TargetId::new("vendor"));
        invoker.invoke(&request("vendor")).unwrap();

        assert_eq!(invoker.dispatched().len(), 2);
        assert_eq!(invoker.take().len(), 2);
        assert!(invoker.dispatched().is_empty());
    }

    #[test]
    fn test_router() {
        let router = DispatchRouter::new();
        let lottery = Arc::new(RecordingInvoker::new());
        router.register(TargetId::new("lottery"), lottery.clone());

        assert!(router.is_routed(&TargetId::new("lottery")));
        router.invoke(&request("lottery")).unwrap();
        assert_eq!(lottery.dispatched().len(), 1);

        assert_eq!(
            router.invoke(&request("staking")),
            Err(DispatchError::UnknownTarget(TargetId::new("staking")))
        );
    }
}
