//! Portfolio and cash ledger models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::fx::{is_valid_currency_code, minor_unit_rule};

/// A portfolio reports every aggregate in exactly one base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    pub id: Option<String>,
    pub name: String,
    pub base_currency: String,
}

impl NewPortfolio {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if !is_valid_currency_code(&self.base_currency) {
            return Err(ValidationError::InvalidCurrencyCode(self.base_currency.clone()).into());
        }
        if minor_unit_rule(&self.base_currency).is_some() {
            return Err(ValidationError::InvalidInput(format!(
                "Base currency cannot be a minor unit ({})",
                self.base_currency
            ))
            .into());
        }
        Ok(())
    }
}

/// Running cash balance of a portfolio, in its base currency, as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashLedgerEntry {
    pub portfolio_id: String,
    pub entry_date: NaiveDate,
    pub balance: Decimal,
}
