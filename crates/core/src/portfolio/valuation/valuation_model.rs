//! Portfolio valuation domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::holdings::ReconstructionWarning;
use crate::quotes::PriceOrigin;

/// Where the cash balance of a valuation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashSource {
    /// Running balance recorded in the cash ledger.
    Ledger,
    /// Recomputed from the transaction log because the ledger had no entry.
    Derived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub security_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub currency: String,
    pub price: Decimal,
    pub price_date: Option<NaiveDate>,
    pub price_origin: PriceOrigin,
    pub market_value: Decimal,
    pub market_value_base: Decimal,
    pub cost_base: Decimal,
    pub unrealized_gain_base: Decimal,
    /// Share of the holdings value, in percent.
    pub weight_pct: Decimal,
}

/// Point-in-time value of a portfolio in its base currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub portfolio_id: String,
    pub valuation_date: NaiveDate,
    pub base_currency: String,
    /// Cash plus holdings value.
    pub total_value: Decimal,
    /// Cost basis of open holdings.
    pub total_cost: Decimal,
    pub cash_balance: Decimal,
    pub cash_source: CashSource,
    pub holdings_value: Decimal,
    pub holdings_count: i64,
    /// `total_value - total_cost - cash_balance`
    pub unrealized_gain: Decimal,
    /// `unrealized_gain / total_cost × 100`, zero when there is no cost.
    pub return_pct: Decimal,
    pub realized_gain: Decimal,
    pub holdings: Vec<HoldingValuation>,
    pub warnings: Vec<ReconstructionWarning>,
}
