//! SQLite storage for portfolios and the external cash ledger.

mod model;
mod repository;

pub use model::{CashLedgerDB, PortfolioDB};
pub use repository::{CashLedgerRepository, PortfolioRepository};

// Re-export traits from core for convenience
pub use ledgerfolio_core::portfolios::{CashLedgerTrait, PortfolioRepositoryTrait};
