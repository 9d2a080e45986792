//! Domain event types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Domain events emitted by core services after successful mutations.
///
/// Events describe what changed; consumers decide what to recompute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Transactions were created, updated, or deleted.
    TransactionsChanged {
        portfolio_ids: Vec<String>,
        security_ids: Vec<String>,
        /// Earliest transaction date touched by the change, before and after
        /// an edit. Snapshots from this date onward are stale.
        earliest_date: NaiveDate,
    },
}

impl DomainEvent {
    /// Creates a TransactionsChanged event, deduplicating ids.
    pub fn transactions_changed(
        mut portfolio_ids: Vec<String>,
        mut security_ids: Vec<String>,
        earliest_date: NaiveDate,
    ) -> Self {
        portfolio_ids.sort();
        portfolio_ids.dedup();
        security_ids.sort();
        security_ids.dedup();
        Self::TransactionsChanged {
            portfolio_ids,
            security_ids,
            earliest_date,
        }
    }
}
