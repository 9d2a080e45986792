use super::fx_model::{ExchangeRate, NewExchangeRate};
use crate::errors::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Trait defining the contract for FX repository operations.
///
/// Rates are stored per direction; the service derives inverses and cross
/// rates, so the repository never needs to.
pub trait FxRepositoryTrait: Send + Sync {
    /// Latest stored rate for `from -> to` dated on or before `date`.
    fn get_rate_on_or_before(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>>;

    /// All stored rates for `from -> to`, ascending by date.
    fn get_rate_history(&self, from: &str, to: &str) -> Result<Vec<ExchangeRate>>;

    /// Insert or replace the rate for (from, to, rate_date).
    fn save_exchange_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate>;

    fn delete_exchange_rate(&self, rate_id: i64) -> Result<()>;
}

/// External rate provider, consulted only for today's rate of a pair.
pub trait ExchangeRateProviderTrait: Send + Sync {
    /// Returns `None` when the provider does not know the pair.
    fn fetch_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>>;
}

/// Trait defining the contract for FX service operations.
pub trait FxServiceTrait: Send + Sync {
    /// Rate to convert one unit of `from_currency` into `to_currency` on `date`.
    fn get_exchange_rate_for_date(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal>;

    fn convert_currency_for_date(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal>;

    /// Most recent rate for the pair regardless of date; used as a degraded
    /// fallback when no rate is in force on the requested date.
    fn get_latest_known_rate(&self, from_currency: &str, to_currency: &str) -> Result<Decimal>;

    fn add_exchange_rate(&self, new_rate: NewExchangeRate) -> Result<ExchangeRate>;

    fn delete_exchange_rate(&self, rate_id: i64) -> Result<()>;

    fn get_rate_history(&self, from_currency: &str, to_currency: &str)
        -> Result<Vec<ExchangeRate>>;
}
