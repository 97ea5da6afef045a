use crate::ledger::BalanceLedger;
use crate::owner_registry::OwnerRegistry;
use crate::proposal_store::ProposalStore;
use custody_types::EventJournal;
use std::sync::Arc;

/// Everything behind a wallet's lock
pub(crate) struct WalletState {
    pub(crate) registry: Arc<OwnerRegistry>,
    pub(crate) store: ProposalStore,
    pub(crate) ledger: Box<dyn BalanceLedger>,
    pub(crate) journal: EventJournal,
}

impl WalletState {
    pub(crate) fn new(registry: Arc<OwnerRegistry>, ledger: Box<dyn BalanceLedger>) -> Self {
        Self {
            registry,
            store: ProposalStore::new(),
            ledger,
            journal: EventJournal::new(),
        }
    }
}
