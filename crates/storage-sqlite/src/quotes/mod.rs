//! SQLite storage for daily quotes.

mod model;
mod repository;

pub use model::QuoteDB;
pub use repository::QuoteRepository;

// Re-export traits from core for convenience
pub use ledgerfolio_core::quotes::{PriceSourceTrait, QuoteStore};
