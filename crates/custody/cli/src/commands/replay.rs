//! Replay a JSON-lines operation log against the wallet

use crate::output::{print_json, OutputFormat};
use crate::state::Session;
use anyhow::{bail, Context, Result};
use custody_runtime::MultisigWallet;
use custody_types::{Operation, OperationOutcome};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Result of one applied log line
#[derive(Debug, Serialize)]
pub struct ReplayEntry {
    pub line: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything applied from a log, plus the reason it stopped early
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub entries: Vec<ReplayEntry>,
    pub stopped: Option<String>,
}

impl ReplayReport {
    pub fn applied(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.applied()
    }
}

/// Apply each operation in `input` in order.
///
/// Blank lines and lines starting with `#` are skipped. A line that does not
/// parse ends the replay; an operation the wallet rejects is recorded and
/// the replay moves on.
pub fn replay_log(wallet: &MultisigWallet, input: impl BufRead) -> ReplayReport {
    let mut report = ReplayReport::default();

    for (index, line) in input.lines().enumerate() {
        let number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                report.stopped = Some(format!("line {}: {}", number, e));
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let operation: Operation = match serde_json::from_str(trimmed) {
            Ok(op) => op,
            Err(e) => {
                report.stopped = Some(format!("line {}: {}", number, e));
                break;
            }
        };

        let op = operation.name();
        match wallet.apply(operation) {
            Ok(outcome) => {
                debug!(line = number, op, "Operation applied");
                report.entries.push(ReplayEntry {
                    line: number,
                    op,
                    outcome: Some(outcome),
                    error: None,
                });
            }
            Err(e) => {
                warn!(line = number, op, error = %e, "Operation rejected");
                report.entries.push(ReplayEntry {
                    line: number,
                    op,
                    outcome: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    report
}

/// Replay `file` against the wallet at `state`, saving whatever was applied
pub fn execute(file: &Path, state: &Path, format: OutputFormat) -> Result<()> {
    let input = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let mut session = Session::open(state)?;
    let report = replay_log(session.wallet(), BufReader::new(input));
    session.save()?;

    match format {
        OutputFormat::Json => print_json(&report.entries)?,
        OutputFormat::Text => {
            for entry in &report.entries {
                match (&entry.outcome, &entry.error) {
                    (Some(outcome), _) => {
                        let rendered =
                            serde_json::to_string(outcome).context("Failed to render outcome")?;
                        println!("line {} {}: ok {}", entry.line, entry.op, rendered);
                    }
                    (None, Some(error)) => {
                        println!("line {} {}: error: {}", entry.line, entry.op, error)
                    }
                    (None, None) => {}
                }
            }
            println!("{} applied, {} rejected", report.applied(), report.failed());
        }
    }

    if let Some(reason) = report.stopped {
        bail!("Replay stopped at unreadable {}", reason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_runtime::{InMemoryLedger, RecordingInvoker};
    use custody_types::{Amount, OwnerId, WalletConfig};
    use std::sync::Arc;

    fn setup() -> (MultisigWallet, Arc<RecordingInvoker>) {
        let invoker = Arc::new(RecordingInvoker::new());
        let wallet = MultisigWallet::new(
            WalletConfig::new(vec![OwnerId::new("alice"), OwnerId::new("bob")], 2),
            Box::new(InMemoryLedger::new()),
            invoker.clone(),
        )
        .unwrap();
        (wallet, invoker)
    }

    #[test]
    fn test_replay_applies_log_in_order() {
        let (wallet, invoker) = setup();
        let log = r#"
# fund, propose, approve
{"op":"deposit","amount":100}
{"op":"submit","caller":"alice","target":"shop","value":40}
{"op":"confirm","caller":"alice","proposal_id":0}
{"op":"confirm","caller":"bob","proposal_id":0}
"#;

        let report = replay_log(&wallet, log.as_bytes());
        assert!(report.stopped.is_none());
        assert_eq!(report.applied(), 4);
        assert_eq!(report.entries[0].line, 3);
        assert_eq!(wallet.balance(), Amount::new(60));
        assert_eq!(invoker.dispatched().len(), 1);
    }

    #[test]
    fn test_replay_continues_past_rejected_operations() {
        let (wallet, _) = setup();
        let log = concat!(
            "{\"op\":\"submit\",\"caller\":\"mallory\",\"target\":\"shop\",\"value\":1}\n",
            "{\"op\":\"submit\",\"caller\":\"bob\",\"target\":\"shop\",\"value\":1}\n",
        );

        let report = replay_log(&wallet, log.as_bytes());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.applied(), 1);
        assert!(report.entries[0].error.as_deref().unwrap().contains("mallory"));
        assert_eq!(wallet.proposal_count(), 1);
    }

    #[test]
    fn test_replay_stops_at_unparseable_line() {
        let (wallet, _) = setup();
        let log = concat!(
            "{\"op\":\"deposit\",\"amount\":5}\n",
            "{\"op\":\"teleport\"}\n",
            "{\"op\":\"deposit\",\"amount\":5}\n",
        );

        let report = replay_log(&wallet, log.as_bytes());
        assert_eq!(report.applied(), 1);
        assert!(report.stopped.as_deref().unwrap().starts_with("line 2"));
        assert_eq!(wallet.balance(), Amount::new(5));
    }
}
