//! In-process job queue.
//!
//! Jobs are received on an unbounded channel and run one at a time on
//! tokio's blocking pool, so the synchronous core services never block the
//! async runtime. Running them in submission order keeps a portfolio's
//! recalculations in the order their events were emitted.

use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::job_model::{JobId, JobOutcome, JobReport, RecalculationJob};
use crate::errors::{Error, Result};
use crate::portfolio::history::HistoryServiceTrait;
use crate::portfolio::performance::PerformanceServiceTrait;

struct QueuedJob {
    id: JobId,
    job: RecalculationJob,
}

/// Services the worker dispatches to.
#[derive(Clone)]
pub struct JobRunner {
    history_service: Arc<dyn HistoryServiceTrait>,
    performance_service: Arc<dyn PerformanceServiceTrait>,
}

impl JobRunner {
    pub fn new(
        history_service: Arc<dyn HistoryServiceTrait>,
        performance_service: Arc<dyn PerformanceServiceTrait>,
    ) -> Self {
        Self {
            history_service,
            performance_service,
        }
    }

    /// Runs a job on the current thread.
    pub fn run(&self, job: &RecalculationJob) -> Result<JobOutcome> {
        match job {
            RecalculationJob::SaveSnapshot {
                portfolio_id,
                date,
                source,
            } => self
                .history_service
                .save_snapshot(portfolio_id, *date, *source)
                .map(JobOutcome::Snapshot),
            RecalculationJob::Backfill(request) => self
                .history_service
                .backfill(
                    &request.portfolio_id,
                    request.start_date,
                    request.end_date,
                    request.force,
                )
                .map(JobOutcome::Backfill),
            RecalculationJob::RecalculateFrom { portfolio_id, from } => self
                .history_service
                .recalculate_from(portfolio_id, *from)
                .map(JobOutcome::Backfill),
            RecalculationJob::InvalidateXirr { portfolio_id } => self
                .performance_service
                .invalidate_xirr(portfolio_id)
                .map(JobOutcome::Invalidated),
            RecalculationJob::SnapshotAll { date, source } => self
                .history_service
                .snapshot_all_portfolios(*date, *source)
                .map(JobOutcome::Sweep),
        }
    }
}

/// Submission side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
}

/// Receiving side returned by `JobQueue::start`.
pub struct JobQueueHandle {
    /// One report per finished job, in completion order.
    pub reports: mpsc::UnboundedReceiver<JobReport>,
    /// Completes once every `JobQueue` clone is dropped and the backlog ran.
    pub worker: JoinHandle<()>,
}

impl JobQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(runner: JobRunner) -> (JobQueue, JobQueueHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (report_tx, reports) = mpsc::unbounded_channel();
        let worker = tokio::spawn(job_worker(rx, report_tx, runner));
        (JobQueue { tx }, JobQueueHandle { reports, worker })
    }

    /// Enqueues a job without blocking.
    pub fn submit(&self, job: RecalculationJob) -> Result<JobId> {
        let id = Uuid::new_v4();
        debug!("Queueing {} job {}", job.kind(), id);
        self.tx
            .send(QueuedJob { id, job })
            .map_err(|e| Error::Queue(format!("job queue is closed: {}", e)))?;
        Ok(id)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn job_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    reports: mpsc::UnboundedSender<JobReport>,
    runner: JobRunner,
) {
    info!("Recalculation job worker started");

    while let Some(QueuedJob { id, job }) = rx.recv().await {
        let task_runner = runner.clone();
        let task_job = job.clone();
        let outcome = match tokio::task::spawn_blocking(move || task_runner.run(&task_job)).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                error!("{} job {} failed: {}", job.kind(), id, e);
                Err(e.to_string())
            }
            Err(e) => {
                error!("{} job {} panicked: {}", job.kind(), id, e);
                Err(format!("job panicked: {}", e))
            }
        };

        if reports.send(JobReport { id, job, outcome }).is_err() {
            debug!("No listener for job report {}", id);
        }
    }

    info!("Recalculation job worker shutting down");
}
