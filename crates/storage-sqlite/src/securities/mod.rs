//! SQLite storage implementation for securities.

mod model;
mod repository;

pub use model::SecurityDB;
pub use repository::SecurityRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::securities::SecurityRepositoryTrait;
