//! Read-only wallet queries

use crate::output::{print_json, print_output, OwnerRow, OutputFormat, ProposalRow};
use crate::state::Session;
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use custody_runtime::ProposalFilter;
use custody_types::{ProposalId, ProposalState};
use serde_json::json;
use std::path::Path;

/// Proposal state accepted by `list --state`
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StateArg {
    Pending,
    Executed,
    Expired,
}

impl From<StateArg> for ProposalState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Pending => ProposalState::Pending,
            StateArg::Executed => ProposalState::Executed,
            StateArg::Expired => ProposalState::Expired,
        }
    }
}

/// Query subcommands
#[derive(Subcommand)]
pub enum QueryCommands {
    /// Show the owner set, balance and outbox size
    Owners,

    /// Show one proposal with its confirmers
    Show { id: u64 },

    /// List proposals
    List {
        /// Only proposals in this state
        #[arg(long)]
        state: Option<StateArg>,

        /// Maximum number of proposals to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Execute a query command
pub fn execute(command: QueryCommands, state: &Path, format: OutputFormat) -> Result<()> {
    let session = Session::open(state)?;
    let wallet = session.wallet();

    match command {
        QueryCommands::Owners => {
            let proposals = wallet.list_proposals(&ProposalFilter::all());
            let rows: Vec<OwnerRow> = wallet
                .list_owners()
                .iter()
                .map(|owner| OwnerRow::new(owner, &proposals))
                .collect();
            let quorum = wallet.quorum();
            let balance = wallet.balance();
            let queued = session.outbox().len();

            match format {
                OutputFormat::Json => print_json(&json!({
                    "owners": rows,
                    "quorum": quorum,
                    "balance": balance,
                    "outbox": queued,
                })),
                OutputFormat::Text => {
                    let owner_count = rows.len();
                    print_output(rows, format)?;
                    println!(
                        "Quorum: {}/{}  Balance: {}  Outbox: {} dispatches",
                        quorum, owner_count, balance, queued
                    );
                    Ok(())
                }
            }
        }

        QueryCommands::Show { id } => {
            let proposal = wallet.get_proposal(ProposalId::new(id))?;
            print_json(&proposal)
        }

        QueryCommands::List { state, limit } => {
            let mut filter = match state {
                Some(s) => ProposalFilter::in_state(s.into()),
                None => ProposalFilter::all(),
            };
            if let Some(limit) = limit {
                filter = filter.with_limit(limit);
            }

            let quorum = wallet.quorum();
            let rows: Vec<ProposalRow> = wallet
                .list_proposals(&filter)
                .iter()
                .map(|proposal| ProposalRow::new(proposal, quorum))
                .collect();
            print_output(rows, format)
        }
    }
}
