use chrono::NaiveDate;

use super::history_model::PortfolioValueSnapshot;
use crate::errors::Result;

/// Storage for `portfolio_value_history`.
pub trait SnapshotRepositoryTrait: Send + Sync {
    fn get_snapshot(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<Option<PortfolioValueSnapshot>>;

    /// Snapshots in `[start, end]`, ascending by date.
    fn get_snapshots_in_range(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioValueSnapshot>>;

    /// Dates in `[start, end]` that have a snapshot, ascending.
    fn get_snapshot_dates(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>>;

    /// Inserts or updates the row for (portfolio, date) in one atomic
    /// statement. Returns true when a new row was inserted. An update keeps
    /// the original `created_at`.
    fn upsert_snapshot(&self, snapshot: &PortfolioValueSnapshot) -> Result<bool>;

    /// Removes every snapshot dated on or after `from`. Returns the count.
    fn delete_snapshots_from(&self, portfolio_id: &str, from: NaiveDate) -> Result<usize>;
}
