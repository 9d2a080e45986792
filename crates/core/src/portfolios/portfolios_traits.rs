use super::portfolios_model::{CashLedgerEntry, NewPortfolio, Portfolio};
use crate::errors::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Trait defining the contract for Portfolio repository operations.
pub trait PortfolioRepositoryTrait: Send + Sync {
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio>;
    fn list(&self) -> Result<Vec<Portfolio>>;
    fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;
}

/// Cash ledger kept outside the transaction log (e.g. broker statements).
pub trait CashLedgerTrait: Send + Sync {
    /// Latest recorded balance dated on or before `date`; `None` when the
    /// ledger has no entry for the portfolio up to that date.
    fn balance_as_of(&self, portfolio_id: &str, date: NaiveDate) -> Result<Option<Decimal>>;

    fn record_balance(&self, entry: CashLedgerEntry) -> Result<()>;
}
