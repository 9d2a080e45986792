//! Turns domain events into recalculation jobs.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::job_model::RecalculationJob;
use crate::events::DomainEvent;

/// Plans the jobs for a batch of events.
///
/// Changes to the same portfolio are merged: history is recalculated once
/// from the earliest touched date, and its cached XIRR results are dropped.
pub fn plan_jobs(events: &[DomainEvent]) -> Vec<RecalculationJob> {
    let mut earliest: BTreeMap<String, NaiveDate> = BTreeMap::new();

    for event in events {
        match event {
            DomainEvent::TransactionsChanged {
                portfolio_ids,
                earliest_date,
                ..
            } => {
                for portfolio_id in portfolio_ids.iter().filter(|id| !id.is_empty()) {
                    earliest
                        .entry(portfolio_id.clone())
                        .and_modify(|date| *date = (*date).min(*earliest_date))
                        .or_insert(*earliest_date);
                }
            }
        }
    }

    earliest
        .into_iter()
        .flat_map(|(portfolio_id, from)| {
            [
                RecalculationJob::InvalidateXirr {
                    portfolio_id: portfolio_id.clone(),
                },
                RecalculationJob::RecalculateFrom { portfolio_id, from },
            ]
        })
        .collect()
}
