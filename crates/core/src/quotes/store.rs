//! Price source traits.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::model::Quote;
use crate::errors::Result;

/// Read side of the market-data collaborator.
pub trait PriceSourceTrait: Send + Sync {
    /// Latest quote dated on or before `date`.
    fn price_on_or_before(&self, security_id: &str, date: NaiveDate) -> Result<Option<Quote>>;

    /// Last known current price of the security, in its quote currency.
    fn current_price(&self, security_id: &str) -> Result<Option<Decimal>>;
}

/// Write side used by imports and manual entry.
pub trait QuoteStore: Send + Sync {
    /// Inserts or replaces the quote for (security, date).
    fn save_quote(&self, quote: &Quote) -> Result<Quote>;

    fn get_quotes_in_range(
        &self,
        security_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>>;
}
