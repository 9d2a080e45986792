//! SQLite storage for exchange rates.

mod model;
mod repository;

pub use model::{ExchangeRateDB, NewExchangeRateDB};
pub use repository::FxRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::fx::FxRepositoryTrait;
