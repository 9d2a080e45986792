//! Security domain models.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::fx::is_valid_currency_code;

/// Broad security classification. Only informs display and grouping;
/// every kind is lot-tracked the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityKind {
    #[default]
    Equity,
    Fund,
    Etf,
    Bond,
    Crypto,
    Cash,
    Other,
}

impl SecurityKind {
    pub const fn as_db_str(&self) -> &'static str {
        match self {
            SecurityKind::Equity => "EQUITY",
            SecurityKind::Fund => "FUND",
            SecurityKind::Etf => "ETF",
            SecurityKind::Bond => "BOND",
            SecurityKind::Crypto => "CRYPTO",
            SecurityKind::Cash => "CASH",
            SecurityKind::Other => "OTHER",
        }
    }
}

impl FromStr for SecurityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EQUITY" | "STOCK" => Ok(SecurityKind::Equity),
            "FUND" | "MUTUAL_FUND" => Ok(SecurityKind::Fund),
            "ETF" => Ok(SecurityKind::Etf),
            "BOND" => Ok(SecurityKind::Bond),
            "CRYPTO" | "CRYPTOCURRENCY" => Ok(SecurityKind::Crypto),
            "CASH" => Ok(SecurityKind::Cash),
            "OTHER" => Ok(SecurityKind::Other),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown security kind '{}'",
                other
            ))),
        }
    }
}

/// A tradable instrument. `symbol` is its identity; the current price and
/// name change when market data is refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub id: String,
    pub symbol: String,
    pub name: Option<String>,
    /// Quote currency, possibly a minor-unit code such as `GBp`.
    pub currency: String,
    pub kind: SecurityKind,
    pub current_price: Option<Decimal>,
    pub price_updated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSecurity {
    /// Defaults to the symbol when omitted.
    pub id: Option<String>,
    pub symbol: String,
    pub name: Option<String>,
    pub currency: String,
    pub kind: SecurityKind,
    pub current_price: Option<Decimal>,
}

impl NewSecurity {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        if !is_valid_currency_code(&self.currency) {
            return Err(ValidationError::InvalidCurrencyCode(self.currency.clone()).into());
        }
        if let Some(price) = self.current_price {
            if price.is_sign_negative() {
                return Err(ValidationError::InvalidInput(format!(
                    "Current price of {} cannot be negative",
                    self.symbol
                ))
                .into());
            }
        }
        Ok(())
    }
}
