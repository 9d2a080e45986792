//! Application settings that tune calculations.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BACKFILL_ERROR_LIMIT, DEFAULT_FX_CACHE_TTL_SECS, DEFAULT_REFERENCE_CURRENCY,
    DEFAULT_XIRR_MIN_SPAN_DAYS,
};
use crate::errors::{Error, Result};
use crate::fx::currency::minor_unit_rule;
use crate::utils::time_utils::DEFAULT_VALUATION_TZ;

pub const SETTING_REFERENCE_CURRENCY: &str = "reference_currency";
pub const SETTING_FEE_POLICY: &str = "fee_policy";
pub const SETTING_FX_CACHE_TTL_SECS: &str = "fx_cache_ttl_secs";
pub const SETTING_XIRR_MIN_SPAN_DAYS: &str = "xirr_min_span_days";
pub const SETTING_BACKFILL_ERROR_LIMIT: &str = "backfill_error_limit";
pub const SETTING_VALUATION_TIMEZONE: &str = "valuation_timezone";

/// How transaction fees enter the cost basis.
///
/// `Capitalize` adds buy fees to the lot cost and deducts sell fees from the
/// proceeds. `Expense` keeps fees out of both; they are only accumulated in
/// `fees_paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeePolicy {
    #[default]
    Capitalize,
    Expense,
}

impl FeePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeePolicy::Capitalize => "CAPITALIZE",
            FeePolicy::Expense => "EXPENSE",
        }
    }
}

impl FromStr for FeePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAPITALIZE" => Ok(FeePolicy::Capitalize),
            "EXPENSE" => Ok(FeePolicy::Expense),
            other => Err(Error::InvalidConfigValue(format!(
                "{}: unknown fee policy '{}'",
                SETTING_FEE_POLICY, other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Currency used as the pivot for triangulated cross rates.
    pub reference_currency: String,
    pub fee_policy: FeePolicy,
    pub fx_cache_ttl_secs: u64,
    pub xirr_min_span_days: i64,
    pub backfill_error_limit: usize,
    /// IANA name of the zone that defines "today" for valuations.
    pub valuation_timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reference_currency: DEFAULT_REFERENCE_CURRENCY.to_string(),
            fee_policy: FeePolicy::default(),
            fx_cache_ttl_secs: DEFAULT_FX_CACHE_TTL_SECS,
            xirr_min_span_days: DEFAULT_XIRR_MIN_SPAN_DAYS,
            backfill_error_limit: DEFAULT_BACKFILL_ERROR_LIMIT,
            valuation_timezone: DEFAULT_VALUATION_TZ.name().to_string(),
        }
    }
}

impl Settings {
    /// Builds settings from stored key/value rows. Missing keys keep their
    /// defaults; present but malformed values are rejected.
    pub fn from_key_values(values: &HashMap<String, String>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(v) = values.get(SETTING_REFERENCE_CURRENCY) {
            settings.reference_currency = v.trim().to_string();
        }
        if let Some(v) = values.get(SETTING_FEE_POLICY) {
            settings.fee_policy = v.parse()?;
        }
        if let Some(v) = values.get(SETTING_FX_CACHE_TTL_SECS) {
            settings.fx_cache_ttl_secs = parse_number(SETTING_FX_CACHE_TTL_SECS, v)?;
        }
        if let Some(v) = values.get(SETTING_XIRR_MIN_SPAN_DAYS) {
            settings.xirr_min_span_days = parse_number(SETTING_XIRR_MIN_SPAN_DAYS, v)?;
        }
        if let Some(v) = values.get(SETTING_BACKFILL_ERROR_LIMIT) {
            settings.backfill_error_limit = parse_number(SETTING_BACKFILL_ERROR_LIMIT, v)?;
        }
        if let Some(v) = values.get(SETTING_VALUATION_TIMEZONE) {
            settings.valuation_timezone = v.trim().to_string();
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let code = &self.reference_currency;
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be a 3-letter ISO code, got '{}'",
                SETTING_REFERENCE_CURRENCY, code
            )));
        }
        if minor_unit_rule(code).is_some() {
            return Err(Error::Configuration(format!(
                "{} cannot be the minor-unit code {}",
                SETTING_REFERENCE_CURRENCY, code
            )));
        }
        if self.xirr_min_span_days < 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must not be negative",
                SETTING_XIRR_MIN_SPAN_DAYS
            )));
        }
        self.valuation_tz()?;
        Ok(())
    }

    pub fn valuation_tz(&self) -> Result<Tz> {
        self.valuation_timezone.parse::<Tz>().map_err(|_| {
            Error::InvalidConfigValue(format!(
                "{}: unknown time zone '{}'",
                SETTING_VALUATION_TIMEZONE, self.valuation_timezone
            ))
        })
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| Error::InvalidConfigValue(format!("{}: '{}' is not a number", key, value)))
}
