//! The JSON state file and the wallet session built on it
//!
//! Layout: `{ snapshot, balance, outbox }`. The outbox holds every accepted
//! dispatch, oldest first, for whatever downstream process performs the
//! actual transfers and calls.

use crate::config::CustodyConfig;
use anyhow::{bail, Context, Result};
use custody_runtime::{InMemoryLedger, MultisigWallet, RecordingInvoker};
use custody_types::{Amount, DispatchRequest, WalletSnapshot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// On-disk wallet state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub snapshot: WalletSnapshot,
    #[serde(default)]
    pub balance: Amount,
    #[serde(default)]
    pub outbox: Vec<DispatchRequest>,
}

impl StateFile {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file {}", path.display()))
    }

    /// Write via a sibling temporary file so a crash never leaves a torn
    /// state file behind
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(path = %path.display(), "State file written");
        Ok(())
    }
}

/// A wallet loaded from a state file, written back on [`Session::save`]
pub struct Session {
    path: PathBuf,
    wallet: MultisigWallet,
    invoker: Arc<RecordingInvoker>,
    outbox: Vec<DispatchRequest>,
}

impl Session {
    /// Start a fresh wallet from the configured owners and quorum
    pub fn create(path: &Path, config: &CustodyConfig, force: bool) -> Result<Self> {
        if path.exists() && !force {
            bail!(
                "State file {} already exists (use --force to overwrite)",
                path.display()
            );
        }

        let invoker = Arc::new(RecordingInvoker::new());
        let wallet = MultisigWallet::new(
            config.wallet.to_wallet_config(),
            Box::new(InMemoryLedger::new()),
            invoker.clone(),
        )
        .context("Invalid wallet configuration")?
        .with_settings(config.execution.clone());

        info!(path = %path.display(), "Wallet initialised");

        Ok(Self {
            path: path.to_path_buf(),
            wallet,
            invoker,
            outbox: Vec::new(),
        })
    }

    /// Load and re-validate the wallet stored at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let state =
            StateFile::read(path).context("No usable wallet state (run `custody init` first?)")?;

        let invoker = Arc::new(RecordingInvoker::new());
        let wallet = MultisigWallet::restore(
            state.snapshot,
            Box::new(InMemoryLedger::with_balance(state.balance)),
            invoker.clone(),
        )
        .with_context(|| format!("Rejected wallet state in {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            wallet,
            invoker,
            outbox: state.outbox,
        })
    }

    pub fn wallet(&self) -> &MultisigWallet {
        &self.wallet
    }

    pub fn outbox(&self) -> &[DispatchRequest] {
        &self.outbox
    }

    /// Move new dispatches into the outbox and persist everything
    pub fn save(&mut self) -> Result<()> {
        let dispatched = self.invoker.take();
        if !dispatched.is_empty() {
            info!(count = dispatched.len(), "Dispatches queued in outbox");
        }
        self.outbox.extend(dispatched);

        StateFile {
            snapshot: self.wallet.snapshot(),
            balance: self.wallet.balance(),
            outbox: self.outbox.clone(),
        }
        .write(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_types::{Action, OwnerId, TargetId};

    fn config() -> CustodyConfig {
        let mut config = CustodyConfig::default();
        config.wallet.owners = vec!["alice".into(), "bob".into()];
        config.wallet.quorum = 2;
        config
    }

    #[test]
    fn test_create_save_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut session = Session::create(&path, &config(), false).unwrap();
        session.wallet().deposit(Amount::new(50)).unwrap();
        let id = session
            .wallet()
            .submit(&OwnerId::new("alice"), TargetId::new("shop"), Amount::new(20), Action::Transfer)
            .unwrap();
        session.wallet().confirm(&OwnerId::new("alice"), id).unwrap();
        session.wallet().confirm(&OwnerId::new("bob"), id).unwrap();
        session.save().unwrap();

        let reopened = Session::open(&path).unwrap();
        assert_eq!(reopened.wallet().balance(), Amount::new(30));
        assert!(reopened.wallet().get_proposal(id).unwrap().is_executed());
        assert_eq!(reopened.outbox().len(), 1);
        assert_eq!(reopened.outbox()[0].target, TargetId::new("shop"));
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        Session::create(&path, &config(), false).unwrap().save().unwrap();
        assert!(Session::create(&path, &config(), false).is_err());
        assert!(Session::create(&path, &config(), true).is_ok());
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = config();
        bad.wallet.quorum = 3;
        assert!(Session::create(&dir.path().join("state.json"), &bad, false).is_err());
    }

    #[test]
    fn test_open_rejects_tampered_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        Session::create(&path, &config(), false).unwrap().save().unwrap();

        let mut state = StateFile::read(&path).unwrap();
        state.snapshot.quorum = 5;
        state.write(&path).unwrap();

        assert!(Session::open(&path).is_err());
    }
}
