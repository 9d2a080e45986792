//! SQLite storage for the daily portfolio value series.

mod model;
mod repository;

pub use model::{NewSnapshotDB, PortfolioValueSnapshotDB};
pub use repository::SnapshotRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::portfolio::history::SnapshotRepositoryTrait;
