//! Quote domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Data source identifiers
pub const DATA_SOURCE_MANUAL: &str = "MANUAL";
pub const DATA_SOURCE_PROVIDER: &str = "PROVIDER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSource {
    /// Imported from the market-data collaborator.
    Provider,
    #[default]
    Manual,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Provider => DATA_SOURCE_PROVIDER,
            DataSource::Manual => DATA_SOURCE_MANUAL,
        }
    }
}

impl From<&str> for DataSource {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            DATA_SOURCE_PROVIDER => DataSource::Provider,
            _ => DataSource::Manual,
        }
    }
}

/// Daily close of a security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub security_id: String,
    pub quote_date: NaiveDate,
    pub close: Decimal,
    /// Currency of `close`; may be a minor-unit code.
    pub currency: String,
    pub data_source: DataSource,
}

/// How a valuation price was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceOrigin {
    /// Quote dated exactly on the valuation date.
    Exact,
    /// Latest quote before the valuation date.
    Prior,
    /// The security's last known current price.
    Current,
    /// Nothing known; valued at zero.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub price: Decimal,
    pub price_date: Option<NaiveDate>,
    pub currency: String,
    pub origin: PriceOrigin,
}
