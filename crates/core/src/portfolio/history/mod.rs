//! Daily value history: snapshots, backfill, gap detection and window statistics.

mod history_model;
mod history_service;
mod history_traits;
pub mod performance_metrics;

pub use history_model::*;
pub use history_service::{HistoryService, HistoryServiceTrait};
pub use history_traits::SnapshotRepositoryTrait;
