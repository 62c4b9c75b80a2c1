//! Ledger event log.

use chrono::{DateTime, Utc};
use fundme_common::{Address, TxId, Usd, Wei};
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A contribution was accepted.
    Funded {
        funder: Address,
        amount: Wei,
        usd_value: Usd,
        round_id: u64,
    },
    /// The owner withdrew the held balance.
    Withdrawn {
        owner: Address,
        amount: Wei,
        funders_cleared: usize,
    },
}

/// A single entry in the ledger's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Transaction that emitted the event.
    pub tx_id: TxId,
    /// Event payload.
    pub kind: EventKind,
    /// Block time of the emitting call.
    pub at: DateTime<Utc>,
}

/// Append-only event history. Withdrawals do not clear it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, tx_id: TxId, kind: EventKind, at: DateTime<Utc>) {
        self.events.push(LedgerEvent { tx_id, kind, at });
    }

    /// All events in emission order.
    pub fn as_slice(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no event was emitted yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of every accepted contribution.
    pub fn total_funded(&self) -> u128 {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Funded { amount, .. } => Some(amount.value()),
                _ => None,
            })
            .sum()
    }

    /// Sum of every withdrawal.
    pub fn total_withdrawn(&self) -> u128 {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Withdrawn { amount, .. } => Some(amount.value()),
                _ => None,
            })
            .sum()
    }
}
