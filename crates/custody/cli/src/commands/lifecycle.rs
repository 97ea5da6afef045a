//! Commands that change wallet state

use super::with_session;
use crate::output::{execution_line, print_single, OutputFormat};
use anyhow::{Context, Result};
use clap::Subcommand;
use custody_types::{Action, Amount, OwnerId, ProposalId, TargetId};
use serde_json::json;
use std::path::Path;

/// Wallet lifecycle subcommands
#[derive(Subcommand)]
pub enum LifecycleCommands {
    /// Add funds to the wallet
    Deposit {
        /// Amount to credit
        #[arg(long)]
        amount: u64,
    },

    /// Propose a transfer or call
    Submit {
        /// Proposing owner
        #[arg(long = "as")]
        as_owner: String,

        /// Destination
        #[arg(long)]
        target: String,

        /// Value to send on execution
        #[arg(long, default_value_t = 0)]
        value: u64,

        /// Method to invoke on the target (omit for a plain transfer)
        #[arg(long)]
        method: Option<String>,

        /// Hex-encoded call arguments
        #[arg(long, requires = "method")]
        args: Option<String>,
    },

    /// Confirm a proposal
    Confirm {
        #[arg(long = "as")]
        as_owner: String,
        id: u64,
    },

    /// Withdraw a confirmation
    Revoke {
        #[arg(long = "as")]
        as_owner: String,
        id: u64,
    },

    /// Execute a proposal that has reached quorum
    Execute {
        #[arg(long = "as")]
        as_owner: String,
        id: u64,
    },

    /// Expire every pending proposal past its deadline
    Expire {
        #[arg(long = "as")]
        as_owner: String,
    },
}

/// Execute a lifecycle command
pub fn execute(command: LifecycleCommands, state: &Path, format: OutputFormat) -> Result<()> {
    match command {
        LifecycleCommands::Deposit { amount } => {
            let balance = with_session(state, |w| w.deposit(Amount::new(amount)))?;
            print_single(&json!({ "balance": balance }), format, || {
                format!("Deposited {}, balance {}", amount, balance)
            })
        }

        LifecycleCommands::Submit {
            as_owner,
            target,
            value,
            method,
            args,
        } => {
            let action = build_action(method, args)?;
            let caller = OwnerId::new(as_owner);
            let id = with_session(state, |w| {
                w.submit(&caller, TargetId::new(target), Amount::new(value), action)
            })?;
            print_single(&json!({ "proposal_id": id }), format, || {
                format!("Submitted proposal #{}", id)
            })
        }

        LifecycleCommands::Confirm { as_owner, id } => {
            let id = ProposalId::new(id);
            let outcome = with_session(state, |w| w.confirm(&OwnerId::new(as_owner), id))?;
            print_single(&outcome, format, || {
                let mut line = format!("#{} confirmed ({} confirmations)", id, outcome.confirmations);
                if outcome.quorum_reached {
                    line.push_str(", quorum reached, ");
                    line.push_str(&execution_line(&outcome.execution));
                }
                line
            })
        }

        LifecycleCommands::Revoke { as_owner, id } => {
            let id = ProposalId::new(id);
            let remaining = with_session(state, |w| w.revoke(&OwnerId::new(as_owner), id))?;
            print_single(
                &json!({ "proposal_id": id, "confirmations": remaining }),
                format,
                || format!("#{} revoked ({} confirmations)", id, remaining),
            )
        }

        LifecycleCommands::Execute { as_owner, id } => {
            let id = ProposalId::new(id);
            let receipt = with_session(state, |w| w.execute(&OwnerId::new(as_owner), id))?;
            print_single(&receipt, format, || {
                format!("#{} executed, {} sent to {}", id, receipt.value, receipt.target)
            })
        }

        LifecycleCommands::Expire { as_owner } => {
            let expired = with_session(state, |w| w.expire_stale(&OwnerId::new(as_owner)))?;
            print_single(&json!({ "expired": expired }), format, || {
                if expired.is_empty() {
                    "No stale proposals".to_string()
                } else {
                    let ids: Vec<String> = expired.iter().map(|id| format!("#{}", id)).collect();
                    format!("Expired {}", ids.join(", "))
                }
            })
        }
    }
}

/// Plain transfer unless a method is named
fn build_action(method: Option<String>, args: Option<String>) -> Result<Action> {
    let Some(method) = method else {
        return Ok(Action::Transfer);
    };
    let args = match args {
        Some(raw) => hex::decode(raw.trim_start_matches("0x"))
            .with_context(|| format!("--args is not valid hex: {}", raw))?,
        None => Vec::new(),
    };
    Ok(Action::invoke(method, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_action() {
        assert_eq!(build_action(None, None).unwrap(), Action::Transfer);
        assert_eq!(
            build_action(Some("mint".into()), Some("0x0a0b".into())).unwrap(),
            Action::invoke("mint", vec![0x0a, 0x0b])
        );
        assert_eq!(
            build_action(Some("ping".into()), None).unwrap(),
            Action::invoke("ping", Vec::new())
        );
        assert!(build_action(Some("mint".into()), Some("zz".into())).is_err());
    }
}
