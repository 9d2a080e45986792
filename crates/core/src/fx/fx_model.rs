use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::FxError;

/// Where a stored rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateSource {
    #[default]
    Manual,
    /// Fetched on demand from the external rate provider.
    Provider,
    /// Computed from other rates (inverse or triangulated) and persisted.
    Derived,
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Manual => "MANUAL",
            RateSource::Provider => "PROVIDER",
            RateSource::Derived => "DERIVED",
        }
    }
}

impl FromStr for RateSource {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(RateSource::Manual),
            "PROVIDER" => Ok(RateSource::Provider),
            "DERIVED" => Ok(RateSource::Derived),
            other => Err(FxError::InvalidRate(format!("unknown rate source '{}'", other))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub id: i64,
    pub from_currency: String,
    pub to_currency: String,
    #[serde(serialize_with = "serialize_decimal_6")]
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: RateSource,
}

impl ExchangeRate {
    /// Pair key in "FROM/TO" form, used in log lines and cache diagnostics.
    pub fn pair_key(from: &str, to: &str) -> String {
        format!("{}/{}", from, to)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    #[serde(serialize_with = "serialize_decimal_6")]
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: RateSource,
}

impl NewExchangeRate {
    pub fn validate(&self) -> Result<(), FxError> {
        if self.rate <= Decimal::ZERO {
            return Err(FxError::InvalidRate(format!(
                "{} on {} must be positive, got {}",
                ExchangeRate::pair_key(&self.from_currency, &self.to_currency),
                self.rate_date,
                self.rate
            )));
        }
        if self.from_currency == self.to_currency {
            return Err(FxError::InvalidRate(format!(
                "identity pair {} cannot be stored",
                self.from_currency
            )));
        }
        Ok(())
    }
}

fn serialize_decimal_6<S>(decimal: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rounded = decimal.round_dp(6);
    serializer.serialize_str(&rounded.to_string())
}
