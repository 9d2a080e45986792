use log::warn;

use super::job_queue::JobQueue;
use super::planner::plan_jobs;
use crate::events::{DomainEvent, DomainEventSink};

/// Event sink that plans recalculation jobs and hands them to a `JobQueue`.
#[derive(Clone)]
pub struct QueueingEventSink {
    queue: JobQueue,
}

impl QueueingEventSink {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }
}

impl DomainEventSink for QueueingEventSink {
    fn emit(&self, event: DomainEvent) {
        self.emit_batch(vec![event]);
    }

    fn emit_batch(&self, events: Vec<DomainEvent>) {
        for job in plan_jobs(&events) {
            if let Err(e) = self.queue.submit(job) {
                warn!("Dropping recalculation job: {}", e);
            }
        }
    }
}
