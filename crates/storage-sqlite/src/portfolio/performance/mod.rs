//! SQLite storage for cached XIRR results.

mod model;
mod repository;

pub use model::XirrCacheDB;
pub use repository::XirrCacheRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::portfolio::performance::XirrCacheRepositoryTrait;
