//! Background recalculation triggered by domain events.

mod job_model;
mod job_queue;
mod planner;
mod queueing_sink;

pub use job_model::*;
pub use job_queue::{JobQueue, JobQueueHandle, JobRunner};
pub use planner::plan_jobs;
pub use queueing_sink::QueueingEventSink;
