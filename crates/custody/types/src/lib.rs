//! Custody Domain Types
//!
//! This crate defines the domain types for a custodial multi-owner wallet:
//! a shared balance that only moves once a quorum of owners has confirmed
//! a specific proposal.
//!
//! # Key Concepts
//!
//! - **Owner**: a principal allowed to submit, confirm, revoke and execute.
//!   The owner set and quorum are fixed by [`WalletConfig`] for the lifetime
//!   of a wallet.
//! - **Proposal**: a recorded intent to move value and/or invoke a target,
//!   carrying its own set of confirmations. Proposals are never deleted.
//! - **Action**: the closed set of effects a proposal may perform once
//!   executed. There is no free-form call data.
//! - **Event Journal**: every state change (and every failed execution
//!   attempt) leaves a [`WalletEvent`] behind.
//!
//! # Architecture
//!
//! This is a pure types crate. The runtime behaviour (locking, quorum
//! evaluation, dispatch) lives in `custody-runtime`. IDs use the newtype
//! pattern and implement `Display`.

#![deny(unsafe_code)]

mod action;
mod amount;
mod config;
mod errors;
mod ids;
mod journal;
mod operation;
mod proposal;
mod snapshot;

pub use action::*;
pub use amount::*;
pub use config::*;
pub use errors::*;
pub use ids::*;
pub use journal::*;
pub use operation::*;
pub use proposal::*;
pub use snapshot::*;
