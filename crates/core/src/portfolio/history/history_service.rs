use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::history_model::{
    BackfillRequest, BackfillResult, GapReport, PerformanceReport, PortfolioFailure,
    PortfolioValueSnapshot, SnapshotSource, SnapshotWriteResult, SweepResult,
};
use super::history_traits::SnapshotRepositoryTrait;
use super::performance_metrics::calculate_performance;
use crate::constants::{DECIMAL_PRECISION, DEFAULT_BACKFILL_ERROR_LIMIT};
use crate::errors::{CalculatorError, Result};
use crate::portfolio::valuation::ValuationServiceTrait;
use crate::portfolios::PortfolioRepositoryTrait;
use crate::settings::Settings;
use crate::transactions::TransactionRepositoryTrait;
use crate::utils::time_utils::{
    get_business_days_between, valuation_date_from_utc, DEFAULT_VALUATION_TZ,
};

pub trait HistoryServiceTrait: Send + Sync {
    /// Values the portfolio on `date` and upserts the snapshot row.
    fn save_snapshot(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
        source: SnapshotSource,
    ) -> Result<SnapshotWriteResult>;

    /// Writes snapshots for every business day in `[start, end]`.
    fn backfill(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
    ) -> Result<BackfillResult>;

    /// Like `backfill`, checking `cancel` before each day.
    fn backfill_with(&self, request: &BackfillRequest, cancel: &AtomicBool)
        -> Result<BackfillResult>;

    /// Rewrites history after the ledger changed on `from`.
    fn recalculate_from(&self, portfolio_id: &str, from: NaiveDate) -> Result<BackfillResult>;

    fn detect_gaps(
        &self,
        portfolio_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<GapReport>;

    /// `None` when the window holds no snapshot.
    fn get_performance(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PerformanceReport>>;

    fn snapshot_all_portfolios(
        &self,
        date: NaiveDate,
        source: SnapshotSource,
    ) -> Result<SweepResult<SnapshotWriteResult>>;

    fn backfill_all_portfolios(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
    ) -> Result<SweepResult<BackfillResult>>;
}

pub struct HistoryService {
    valuation_service: Arc<dyn ValuationServiceTrait>,
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    error_limit: usize,
    valuation_tz: Tz,
}

impl HistoryService {
    pub fn new(
        valuation_service: Arc<dyn ValuationServiceTrait>,
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            valuation_service,
            snapshot_repository,
            portfolio_repository,
            transaction_repository,
            error_limit: DEFAULT_BACKFILL_ERROR_LIMIT,
            valuation_tz: DEFAULT_VALUATION_TZ,
        }
    }

    pub fn with_settings(mut self, settings: &Settings) -> Result<Self> {
        self.error_limit = settings.backfill_error_limit;
        self.valuation_tz = settings.valuation_tz()?;
        Ok(self)
    }

    fn today(&self) -> NaiveDate {
        valuation_date_from_utc(Utc::now(), self.valuation_tz)
    }

    fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
        if start > end {
            return Err(CalculatorError::InvalidDateRange { start, end }.into());
        }
        Ok(())
    }

    fn run_backfill(
        &self,
        request: &BackfillRequest,
        source: SnapshotSource,
        cancel: &AtomicBool,
    ) -> Result<BackfillResult> {
        Self::check_range(request.start_date, request.end_date)?;
        let portfolio_id = request.portfolio_id.as_str();
        self.portfolio_repository.get_by_id(portfolio_id)?;

        let existing: HashSet<NaiveDate> = self
            .snapshot_repository
            .get_snapshot_dates(portfolio_id, request.start_date, request.end_date)?
            .into_iter()
            .collect();

        let mut result = BackfillResult {
            portfolio_id: portfolio_id.to_string(),
            ..BackfillResult::default()
        };

        for date in get_business_days_between(request.start_date, request.end_date) {
            if cancel.load(Ordering::Relaxed) {
                info!("Backfill of {} cancelled before {}", portfolio_id, date);
                result.cancelled = true;
                break;
            }
            if !request.force && existing.contains(&date) {
                result.skipped += 1;
                continue;
            }
            match self.save_snapshot(portfolio_id, date, source) {
                Ok(write) if write.created => result.created += 1,
                Ok(_) => result.updated += 1,
                Err(e) => {
                    warn!("Snapshot of {} on {} failed: {}", portfolio_id, date, e);
                    result.failed += 1;
                    if result.errors.len() < self.error_limit {
                        result.errors.push(format!("{}: {}", date, e));
                    }
                }
            }
        }

        info!(
            "Backfill {} {}..{}: created {}, updated {}, skipped {}, failed {}",
            portfolio_id,
            request.start_date,
            request.end_date,
            result.created,
            result.updated,
            result.skipped,
            result.failed
        );
        Ok(result)
    }

    fn sweep<T, F>(&self, run: F) -> Result<SweepResult<T>>
    where
        T: Send,
        F: Fn(&str) -> Result<T> + Sync,
    {
        let portfolios = self.portfolio_repository.list()?;
        let outcomes: Vec<(String, Result<T>)> = portfolios
            .par_iter()
            .map(|portfolio| (portfolio.id.clone(), run(&portfolio.id)))
            .collect();

        let mut sweep = SweepResult {
            results: Vec::new(),
            failures: Vec::new(),
        };
        for (portfolio_id, outcome) in outcomes {
            match outcome {
                Ok(value) => sweep.results.push(value),
                Err(e) => {
                    warn!("Portfolio {} failed during sweep: {}", portfolio_id, e);
                    sweep.failures.push(PortfolioFailure {
                        portfolio_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(sweep)
    }
}

impl HistoryServiceTrait for HistoryService {
    fn save_snapshot(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
        source: SnapshotSource,
    ) -> Result<SnapshotWriteResult> {
        let valuation = self.valuation_service.value_on_date(portfolio_id, date)?;
        let snapshot =
            PortfolioValueSnapshot::from_valuation(&valuation, source, Utc::now().naive_utc());

        let created = match self.snapshot_repository.upsert_snapshot(&snapshot) {
            Ok(created) => created,
            Err(e) if e.is_unique_violation() => {
                debug!(
                    "Snapshot {} on {} was written concurrently; keeping it",
                    portfolio_id, date
                );
                false
            }
            Err(e) => return Err(e),
        };
        Ok(SnapshotWriteResult { snapshot, created })
    }

    fn backfill(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
    ) -> Result<BackfillResult> {
        let request = BackfillRequest {
            portfolio_id: portfolio_id.to_string(),
            start_date: start,
            end_date: end,
            force,
        };
        self.backfill_with(&request, &AtomicBool::new(false))
    }

    fn backfill_with(
        &self,
        request: &BackfillRequest,
        cancel: &AtomicBool,
    ) -> Result<BackfillResult> {
        self.run_backfill(request, SnapshotSource::Backfill, cancel)
    }

    fn recalculate_from(&self, portfolio_id: &str, from: NaiveDate) -> Result<BackfillResult> {
        let today = self.today();
        if self
            .transaction_repository
            .earliest_transaction_date(portfolio_id)?
            .is_none()
        {
            let removed = self
                .snapshot_repository
                .delete_snapshots_from(portfolio_id, from)?;
            debug!("Portfolio {} has no transactions; removed {} snapshots", portfolio_id, removed);
            return Ok(BackfillResult {
                portfolio_id: portfolio_id.to_string(),
                ..BackfillResult::default()
            });
        }
        if from > today {
            return Ok(BackfillResult {
                portfolio_id: portfolio_id.to_string(),
                ..BackfillResult::default()
            });
        }

        let request = BackfillRequest {
            portfolio_id: portfolio_id.to_string(),
            start_date: from,
            end_date: today,
            force: true,
        };
        self.run_backfill(&request, SnapshotSource::TransactionTrigger, &AtomicBool::new(false))
    }

    fn detect_gaps(
        &self,
        portfolio_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<GapReport> {
        let end = end.unwrap_or_else(|| self.today());
        let start = match start {
            Some(date) => {
                Self::check_range(date, end)?;
                Some(date)
            }
            // A ledger that starts after the window has nothing to cover yet.
            None => self
                .transaction_repository
                .earliest_transaction_date(portfolio_id)?
                .filter(|earliest| *earliest <= end),
        };

        let Some(start) = start else {
            return Ok(GapReport {
                portfolio_id: portfolio_id.to_string(),
                start_date: None,
                end_date: Some(end),
                expected_days: 0,
                existing_days: 0,
                missing_dates: Vec::new(),
                total_missing: 0,
                coverage_pct: dec!(100),
            });
        };

        let expected = get_business_days_between(start, end);
        let existing: HashSet<NaiveDate> = self
            .snapshot_repository
            .get_snapshot_dates(portfolio_id, start, end)?
            .into_iter()
            .collect();
        let missing_dates: Vec<NaiveDate> = expected
            .iter()
            .filter(|d| !existing.contains(d))
            .copied()
            .collect();

        let expected_days = expected.len();
        let covered = expected_days - missing_dates.len();
        let coverage_pct = if expected_days == 0 {
            dec!(100)
        } else {
            (Decimal::from(covered) / Decimal::from(expected_days) * dec!(100))
                .round_dp(DECIMAL_PRECISION)
        };

        Ok(GapReport {
            portfolio_id: portfolio_id.to_string(),
            start_date: Some(start),
            end_date: Some(end),
            expected_days,
            existing_days: covered,
            total_missing: missing_dates.len(),
            missing_dates,
            coverage_pct,
        })
    }

    fn get_performance(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PerformanceReport>> {
        Self::check_range(start, end)?;
        let snapshots = self
            .snapshot_repository
            .get_snapshots_in_range(portfolio_id, start, end)?;
        Ok(calculate_performance(portfolio_id, &snapshots))
    }

    fn snapshot_all_portfolios(
        &self,
        date: NaiveDate,
        source: SnapshotSource,
    ) -> Result<SweepResult<SnapshotWriteResult>> {
        self.sweep(|portfolio_id| self.save_snapshot(portfolio_id, date, source))
    }

    fn backfill_all_portfolios(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
    ) -> Result<SweepResult<BackfillResult>> {
        Self::check_range(start, end)?;
        self.sweep(|portfolio_id| self.backfill(portfolio_id, start, end, force))
    }
}
