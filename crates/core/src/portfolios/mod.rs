//! Portfolios module - portfolio identity, base currency, and cash ledger.

mod portfolios_model;
mod portfolios_traits;

pub use portfolios_model::{CashLedgerEntry, NewPortfolio, Portfolio};
pub use portfolios_traits::{CashLedgerTrait, PortfolioRepositoryTrait};
