//! Balance ledger: the collaborator holding the wallet's funds
//!
//! The wallet never stores value itself. It asks a [`BalanceLedger`] for
//! the available balance, debits it when a proposal executes, and credits
//! it for deposits and for refunding a debit whose dispatch failed.

use custody_types::{Amount, CustodyError};
use thiserror::Error;
use tracing::debug;

/// Source of the funds a wallet controls
pub trait BalanceLedger: Send {
    fn balance(&self) -> Amount;

    /// Remove `amount` from the balance, or fail without changing it
    fn debit(&mut self, amount: Amount) -> Result<(), LedgerError>;

    /// Add `amount` to the balance, or fail without changing it
    fn credit(&mut self, amount: Amount) -> Result<(), LedgerError>;
}

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Balance overflow")]
    Overflow,

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl From<LedgerError> for CustodyError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                required,
                available,
            } => CustodyError::InsufficientBalance {
                required: required.value(),
                available: available.value(),
            },
            other => CustodyError::Ledger(other.to_string()),
        }
    }
}

/// A ledger that keeps the balance in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balance: Amount,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: Amount) -> Self {
        Self { balance }
    }
}

impl BalanceLedger for InMemoryLedger {
    fn balance(&self) -> Amount {
        self.balance
    }

    fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                required: amount,
                available: self.balance,
            })?;
        debug!(amount = amount.value(), balance = self.balance.value(), "Ledger debited");
        Ok(())
    }

    fn credit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        debug!(amount = amount.value(), balance = self.balance.value(), "Ledger credited");
        Ok(())
    }
}
