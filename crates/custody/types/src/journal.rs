//! Event journal: the wallet's append-only accountability record
//!
//! Every successful mutation produces an event, and so does every failed
//! execution attempt. Events are never edited or removed.

use crate::{Amount, OwnerId, ProposalId, TargetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEventKind {
    Submitted {
        proposal_id: ProposalId,
        target: TargetId,
        value: Amount,
    },
    Confirmed {
        proposal_id: ProposalId,
        confirmations: u32,
    },
    Revoked {
        proposal_id: ProposalId,
        confirmations: u32,
    },
    Executed {
        proposal_id: ProposalId,
        value: Amount,
    },
    ExecutionFailed {
        proposal_id: ProposalId,
        reason: String,
    },
    /// Dispatch failed and the debit could not be returned; the proposal
    /// stays executed
    RefundFailed {
        proposal_id: ProposalId,
        value: Amount,
        reason: String,
    },
    Deposited {
        amount: Amount,
    },
    Expired {
        proposal_id: ProposalId,
    },
}

impl WalletEventKind {
    /// Proposal the event refers to, if any
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            WalletEventKind::Submitted { proposal_id, .. }
            | WalletEventKind::Confirmed { proposal_id, .. }
            | WalletEventKind::Revoked { proposal_id, .. }
            | WalletEventKind::Executed { proposal_id, .. }
            | WalletEventKind::ExecutionFailed { proposal_id, .. }
            | WalletEventKind::RefundFailed { proposal_id, .. }
            | WalletEventKind::Expired { proposal_id } => Some(*proposal_id),
            WalletEventKind::Deposited { .. } => None,
        }
    }
}

/// A journaled wallet event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEvent {
    /// Position in the journal, starting at 0
    pub sequence: u64,
    /// Globally unique event identifier
    pub event_id: String,
    /// Owner whose call produced the event; `None` for deposits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<OwnerId>,
    pub kind: WalletEventKind,
    pub timestamp: DateTime<Utc>,
}

/// Append-only list of wallet events
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventJournal {
    events: Vec<WalletEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return it
    pub fn record(
        &mut self,
        actor: Option<OwnerId>,
        kind: WalletEventKind,
        timestamp: DateTime<Utc>,
    ) -> &WalletEvent {
        let event = WalletEvent {
            sequence: self.events.len() as u64,
            event_id: uuid::Uuid::new_v4().to_string(),
            actor,
            kind,
            timestamp,
        };
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[WalletEvent] {
        &self.events
    }

    /// Events with a sequence number at or after `sequence`
    pub fn since(&self, sequence: u64) -> &[WalletEvent] {
        match usize::try_from(sequence) {
            Ok(start) if start < self.events.len() => &self.events[start..],
            _ => &[],
        }
    }

    pub fn for_proposal(&self, id: ProposalId) -> Vec<&WalletEvent> {
        self.events
            .iter()
            .filter(|e| e.kind.proposal_id() == Some(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True when sequence numbers run 0, 1, 2, ... without gaps
    pub fn is_contiguous(&self) -> bool {
        self.events
            .iter()
            .enumerate()
            .all(|(i, e)| e.sequence == i as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assigns_sequence() {
        let mut journal = EventJournal::new();
        let now = Utc::now();

        journal.record(
            None,
            WalletEventKind::Deposited {
                amount: Amount::new(100),
            },
            now,
        );
        let second = journal.record(
            Some(OwnerId::new("alice")),
            WalletEventKind::Submitted {
                proposal_id: ProposalId::new(0),
                target: TargetId::new("vendor"),
                value: Amount::new(10),
            },
            now,
        );

        assert_eq!(second.sequence, 1);
        assert_eq!(journal.len(), 2);
        assert!(journal.is_contiguous());
        assert_eq!(journal.since(1).len(), 1);
        assert!(journal.since(10).is_empty());
        assert!(journal.since(1 << 32).is_empty());
        assert!(journal.since(u64::MAX).is_empty());
    }

    #[test]
    fn test_for_proposal() {
        let mut journal = EventJournal::new();
        let now = Utc::now();
        for id in [0, 1, 0] {
            journal.record(
                Some(OwnerId::new("alice")),
                WalletEventKind::Confirmed {
                    proposal_id: ProposalId::new(id),
                    confirmations: 1,
                },
                now,
            );
        }
        assert_eq!(journal.for_proposal(ProposalId::new(0)).len(), 2);
    }

    #[test]
    fn test_event_kind_serde() {
        let kind = WalletEventKind::Expired {
            proposal_id: ProposalId::new(3),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"type":"expired","proposal_id":3}"#);
    }
}
