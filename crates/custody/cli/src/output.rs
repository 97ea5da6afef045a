//! Output formatting utilities

use anyhow::{Context, Result};
use colored::*;
use custody_types::{ExecutionOutcome, OwnerId, Proposal};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tables and human-readable lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Print a list of rows as a table, or as a JSON array
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if data.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
            Ok(())
        }
        OutputFormat::Json => print_json(&data),
    }
}

/// Print `data` as JSON, or the text produced by `text`
pub fn print_single<T: Serialize>(
    data: &T,
    format: OutputFormat,
    text: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Text => {
            println!("{}", text());
            Ok(())
        }
    }
}

/// Always JSON, for commands whose result is structured data
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to render output")?;
    println!("{}", json);
    Ok(())
}

/// Table row for proposal listings
#[derive(Debug, Serialize, Tabled)]
pub struct ProposalRow {
    pub id: u64,
    pub action: String,
    pub value: u64,
    pub target: String,
    pub state: String,
    /// Confirmations over quorum
    pub confirmations: String,
}

impl ProposalRow {
    pub fn new(proposal: &Proposal, quorum: u32) -> Self {
        Self {
            id: proposal.id.value(),
            action: proposal.action.label().to_string(),
            value: proposal.value.value(),
            target: proposal.target.to_string(),
            state: proposal.state.to_string(),
            confirmations: format!("{}/{}", proposal.confirmation_count(), quorum),
        }
    }
}

/// Table row for the owner set
#[derive(Debug, Serialize, Tabled)]
pub struct OwnerRow {
    pub owner: String,
    /// Proposals this owner submitted
    pub proposed: usize,
    /// Pending proposals this owner has confirmed
    pub confirming: usize,
}

impl OwnerRow {
    pub fn new(owner: &OwnerId, proposals: &[Proposal]) -> Self {
        Self {
            owner: owner.to_string(),
            proposed: proposals.iter().filter(|p| &p.proposer == owner).count(),
            confirming: proposals
                .iter()
                .filter(|p| p.is_pending() && p.is_confirmed_by(owner))
                .count(),
        }
    }
}

pub fn execution_line(outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::NotAttempted => "not executed".dimmed().to_string(),
        ExecutionOutcome::Executed(receipt) => format!(
            "{}, {} sent to {}",
            "executed".green(),
            receipt.value,
            receipt.target
        ),
        ExecutionOutcome::Failed(err) => format!("{}: {}", "execution failed".red(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use custody_types::{Action, Amount, ProposalId, TargetId};

    fn proposal(id: u64, proposer: &str) -> Proposal {
        Proposal::new(
            ProposalId::new(id),
            OwnerId::new(proposer),
            TargetId::new("shop"),
            Amount::new(20),
            Action::Transfer,
            Utc::now(),
        )
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_flag(true), OutputFormat::Json);
    }

    #[test]
    fn test_proposal_row() {
        let row = ProposalRow::new(&proposal(3, "alice"), 2);
        assert_eq!(row.id, 3);
        assert_eq!(row.action, "transfer");
        assert_eq!(row.target, "shop");
        assert_eq!(row.state, "pending");
        assert_eq!(row.confirmations, "0/2");

        let table = Table::new(vec![row]).to_string();
        assert!(table.contains("confirmations"));
        assert!(table.contains("0/2"));
    }

    #[test]
    fn test_owner_row_counts() {
        let mut confirmed = proposal(0, "alice");
        assert!(confirmed.add_confirmation(OwnerId::new("bob"), Utc::now()));
        let proposals = vec![confirmed, proposal(1, "alice"), proposal(2, "bob")];

        let alice = OwnerRow::new(&OwnerId::new("alice"), &proposals);
        assert_eq!((alice.proposed, alice.confirming), (2, 0));

        let bob = OwnerRow::new(&OwnerId::new("bob"), &proposals);
        assert_eq!((bob.proposed, bob.confirming), (1, 1));
    }
}
