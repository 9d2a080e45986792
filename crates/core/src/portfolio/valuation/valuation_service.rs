use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;

use super::valuation_calculator::calculate_valuation;
use super::valuation_model::{CashSource, PortfolioValuation};
use crate::errors::Result;
use crate::portfolio::holdings::HoldingsServiceTrait;
use crate::portfolios::CashLedgerTrait;

pub trait ValuationServiceTrait: Send + Sync {
    /// Values a portfolio on `date`. Missing prices and rates degrade to
    /// warnings; only configuration and storage errors fail.
    fn value_on_date(&self, portfolio_id: &str, date: NaiveDate) -> Result<PortfolioValuation>;
}

pub struct ValuationService {
    holdings_service: Arc<dyn HoldingsServiceTrait>,
    cash_ledger: Arc<dyn CashLedgerTrait>,
}

impl ValuationService {
    pub fn new(
        holdings_service: Arc<dyn HoldingsServiceTrait>,
        cash_ledger: Arc<dyn CashLedgerTrait>,
    ) -> Self {
        Self {
            holdings_service,
            cash_ledger,
        }
    }
}

impl ValuationServiceTrait for ValuationService {
    fn value_on_date(&self, portfolio_id: &str, date: NaiveDate) -> Result<PortfolioValuation> {
        let reconstructed = self.holdings_service.reconstruct_holdings(portfolio_id, date)?;

        let ledger_balance = self.cash_ledger.balance_as_of(portfolio_id, date)?;
        let (cash_balance, cash_source) = match ledger_balance {
            Some(balance) => (balance, CashSource::Ledger),
            None => (reconstructed.cash.balance(), CashSource::Derived),
        };

        let valuation = calculate_valuation(reconstructed, cash_balance, cash_source);
        debug!(
            "Valued portfolio {} on {}: total {} {} ({} holdings)",
            portfolio_id,
            date,
            valuation.total_value,
            valuation.base_currency,
            valuation.holdings_count
        );
        Ok(valuation)
    }
}
