use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::portfolio::history::{
    BackfillRequest, BackfillResult, SnapshotSource, SnapshotWriteResult, SweepResult,
};

pub type JobId = Uuid;

/// Recomputation work that runs off the caller's thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecalculationJob {
    SaveSnapshot {
        portfolio_id: String,
        date: NaiveDate,
        source: SnapshotSource,
    },
    Backfill(BackfillRequest),
    /// Rewrites history from `from` up to today after a ledger change.
    RecalculateFrom {
        portfolio_id: String,
        from: NaiveDate,
    },
    InvalidateXirr {
        portfolio_id: String,
    },
    SnapshotAll {
        date: NaiveDate,
        source: SnapshotSource,
    },
}

impl RecalculationJob {
    pub fn kind(&self) -> &'static str {
        match self {
            RecalculationJob::SaveSnapshot { .. } => "save_snapshot",
            RecalculationJob::Backfill(_) => "backfill",
            RecalculationJob::RecalculateFrom { .. } => "recalculate_from",
            RecalculationJob::InvalidateXirr { .. } => "invalidate_xirr",
            RecalculationJob::SnapshotAll { .. } => "snapshot_all",
        }
    }

    pub fn portfolio_id(&self) -> Option<&str> {
        match self {
            RecalculationJob::SaveSnapshot { portfolio_id, .. }
            | RecalculationJob::RecalculateFrom { portfolio_id, .. }
            | RecalculationJob::InvalidateXirr { portfolio_id } => Some(portfolio_id),
            RecalculationJob::Backfill(request) => Some(&request.portfolio_id),
            RecalculationJob::SnapshotAll { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum JobOutcome {
    Snapshot(SnapshotWriteResult),
    Backfill(BackfillResult),
    Sweep(SweepResult<SnapshotWriteResult>),
    Invalidated(usize),
}

/// Result of one job, published after it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub id: JobId,
    pub job: RecalculationJob,
    pub outcome: std::result::Result<JobOutcome, String>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}
