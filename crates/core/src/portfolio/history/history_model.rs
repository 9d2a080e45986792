//! Portfolio value history models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{Error, ValidationError};
use crate::portfolio::valuation::{derive_gain_and_return, PortfolioValuation};

/// What caused a snapshot row to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    #[default]
    Daily,
    Manual,
    Backfill,
    TransactionTrigger,
}

impl SnapshotSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotSource::Daily => "daily",
            SnapshotSource::Manual => "manual",
            SnapshotSource::Backfill => "backfill",
            SnapshotSource::TransactionTrigger => "transaction_trigger",
        }
    }
}

impl FromStr for SnapshotSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(SnapshotSource::Daily),
            "manual" => Ok(SnapshotSource::Manual),
            "backfill" => Ok(SnapshotSource::Backfill),
            "transaction_trigger" => Ok(SnapshotSource::TransactionTrigger),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown snapshot source '{}'",
                other
            ))
            .into()),
        }
    }
}

/// One row of a portfolio's daily value series, unique per (portfolio, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValueSnapshot {
    pub portfolio_id: String,
    pub snapshot_date: NaiveDate,
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub cash_balance: Decimal,
    pub holdings_count: i64,
    pub unrealized_gain: Decimal,
    pub return_pct: Decimal,
    pub source: SnapshotSource,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PortfolioValueSnapshot {
    pub fn from_valuation(
        valuation: &PortfolioValuation,
        source: SnapshotSource,
        now: NaiveDateTime,
    ) -> Self {
        let mut snapshot = PortfolioValueSnapshot {
            portfolio_id: valuation.portfolio_id.clone(),
            snapshot_date: valuation.valuation_date,
            total_value: valuation.total_value,
            total_cost: valuation.total_cost,
            cash_balance: valuation.cash_balance,
            holdings_count: valuation.holdings_count,
            unrealized_gain: Decimal::ZERO,
            return_pct: Decimal::ZERO,
            source,
            created_at: now,
            updated_at: now,
        };
        snapshot.recompute_derived();
        snapshot
    }

    /// Rederives `unrealized_gain` and `return_pct` from the stored totals.
    /// Called before every write so the derived columns never drift.
    pub fn recompute_derived(&mut self) {
        let (unrealized_gain, return_pct) =
            derive_gain_and_return(self.total_value, self.total_cost, self.cash_balance);
        self.unrealized_gain = unrealized_gain;
        self.return_pct = return_pct;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotWriteResult {
    pub snapshot: PortfolioValueSnapshot,
    /// False when an existing row for the same date was updated, including
    /// the case where a concurrent writer inserted it first.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillRequest {
    pub portfolio_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Rewrite dates that already have a snapshot.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResult {
    pub portfolio_id: String,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The first few per-day failures; `failed` has the full count.
    pub errors: Vec<String>,
    pub cancelled: bool,
}

impl BackfillResult {
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapReport {
    pub portfolio_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub expected_days: usize,
    pub existing_days: usize,
    pub missing_dates: Vec<NaiveDate>,
    pub total_missing: usize,
    pub coverage_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub value: Decimal,
    /// Change from the previous snapshot, in percent.
    pub return_pct: Decimal,
}

/// Statistics over the snapshots of one window. Returns are measured
/// against the first snapshot in the window, never against inception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub portfolio_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_points: usize,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub total_return_pct: Decimal,
    pub daily_returns: Vec<DailyReturn>,
    /// Population standard deviation of daily returns, in percent.
    pub volatility_pct: Decimal,
    pub annualized_volatility_pct: Decimal,
    pub best_day: Option<DailyReturn>,
    pub worst_day: Option<DailyReturn>,
    /// Largest peak-to-trough fall, as a positive percentage.
    pub max_drawdown_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioFailure {
    pub portfolio_id: String,
    pub error: String,
}

/// Outcome of a sweep over every portfolio. One portfolio failing never
/// stops the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult<T> {
    pub results: Vec<T>,
    pub failures: Vec<PortfolioFailure>,
}
