//! Custody Runtime
//!
//! This crate provides the runtime for a custodial multi-owner wallet: a
//! shared balance that moves only after a quorum of owners has confirmed a
//! specific proposal.
//!
//! # Architecture
//!
//! The [`MultisigWallet`] is the main entry point and the wallet's single
//! lock boundary. It composes:
//!
//! - [`OwnerRegistry`]: The fixed owner set and quorum
//! - [`ProposalStore`]: Append-only, sequentially numbered proposals
//! - [`ConfirmationTracker`]: Per-proposal confirmations and the quorum edge
//! - [`ExecutionEngine`]: Checks, effects, then the external call
//! - [`QueryFacade`]: Read-only views
//!
//! Collaborators are traits so the wallet can sit in front of any ledger
//! or target:
//!
//! - [`BalanceLedger`]: Holds the funds ([`InMemoryLedger`])
//! - [`TargetInvoker`]: Performs the executed action ([`RecordingInvoker`], [`DispatchRouter`])
//! - [`Clock`]: Time source for proposal deadlines ([`SystemClock`], [`ManualClock`])
//!
//! # Key Invariants
//!
//! 1. Only owners submit, confirm, revoke and execute
//! 2. A proposal executes at most once, and only with quorum
//! 3. The executed flag is committed before the target is called
//! 4. A failed dispatch is refunded and leaves no trace but an
//!    `ExecutionFailed` event; if the refund is refused the proposal stays
//!    executed and a `RefundFailed` event is journaled
//! 5. Every state change is journaled
//!
//! # Example
//!
//! ```rust
//! use custody_runtime::{InMemoryLedger, MultisigWallet, RecordingInvoker};
//! use custody_types::{Action, Amount, OwnerId, TargetId, WalletConfig};
//! use std::sync::Arc;
//!
//! let owners = vec![OwnerId::new("alice"), OwnerId::new("bob"), OwnerId::new("carol")];
//! let invoker = Arc::new(RecordingInvoker::new());
//! let wallet = MultisigWallet::new(
//!     WalletConfig::new(owners, 2),
//!     Box::new(InMemoryLedger::with_balance(Amount::new(1_000))),
//!     invoker.clone(),
//! )
//! .unwrap();
//!
//! let id = wallet
//!     .submit(&OwnerId::new("alice"), TargetId::new("vendor"), Amount::new(250), Action::Transfer)
//!     .unwrap();
//! wallet.confirm(&OwnerId::new("alice"), id).unwrap();
//! let outcome = wallet.confirm(&OwnerId::new("bob"), id).unwrap();
//!
//! assert!(outcome.executed());
//! assert_eq!(wallet.balance(), Amount::new(750));
//! assert_eq!(invoker.dispatched().len(), 1);
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod confirmation_tracker;
pub mod dispatch;
pub mod execution_engine;
pub mod ledger;
pub mod owner_registry;
pub mod proposal_store;
pub mod query;
mod state;
pub mod wallet;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use confirmation_tracker::{ConfirmationChange, ConfirmationTracker};
pub use dispatch::{DispatchError, DispatchRouter, RecordingInvoker, TargetInvoker};
pub use execution_engine::ExecutionEngine;
pub use ledger::{BalanceLedger, InMemoryLedger, LedgerError};
pub use owner_registry::OwnerRegistry;
pub use proposal_store::{ProposalDraft, ProposalStore};
pub use query::{ProposalFilter, QueryFacade};
pub use wallet::MultisigWallet;
