use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// A dated cash flow from the investor's point of view: money put in is
/// negative, money taken out (and the terminal value) is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: Decimal) -> Self {
        Self { date, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XirrMethod {
    Brent,
    Newton,
}

impl XirrMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            XirrMethod::Brent => "brent",
            XirrMethod::Newton => "newton",
        }
    }
}

impl FromStr for XirrMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brent" => Ok(XirrMethod::Brent),
            "newton" => Ok(XirrMethod::Newton),
            other => Err(
                ValidationError::InvalidInput(format!("unknown XIRR method '{}'", other)).into(),
            ),
        }
    }
}

/// Why an XIRR is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XirrUndefinedReason {
    TooFewFlows,
    SingleSign,
    SpanTooShort,
    NoConvergence,
}

impl XirrUndefinedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            XirrUndefinedReason::TooFewFlows => "too_few_flows",
            XirrUndefinedReason::SingleSign => "single_sign",
            XirrUndefinedReason::SpanTooShort => "span_too_short",
            XirrUndefinedReason::NoConvergence => "no_convergence",
        }
    }
}

impl fmt::Display for XirrUndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            XirrUndefinedReason::TooFewFlows => "fewer than two cash flows",
            XirrUndefinedReason::SingleSign => "cash flows all have the same sign",
            XirrUndefinedReason::SpanTooShort => "cash flows span too few days",
            XirrUndefinedReason::NoConvergence => "no rate solves the cash flows",
        };
        f.write_str(text)
    }
}

impl FromStr for XirrUndefinedReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "too_few_flows" => Ok(XirrUndefinedReason::TooFewFlows),
            "single_sign" => Ok(XirrUndefinedReason::SingleSign),
            "span_too_short" => Ok(XirrUndefinedReason::SpanTooShort),
            "no_convergence" => Ok(XirrUndefinedReason::NoConvergence),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown XIRR reason '{}'",
                other
            ))
            .into()),
        }
    }
}

/// Annualized money-weighted return. `rate == Some(0)` is a real 0% return;
/// `rate == None` is undefined and `reason` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XirrResult {
    pub rate: Option<Decimal>,
    pub reason: Option<XirrUndefinedReason>,
    pub method: Option<XirrMethod>,
    pub from_cache: bool,
}

impl XirrResult {
    pub fn solved(rate: Decimal, method: XirrMethod) -> Self {
        Self {
            rate: Some(rate),
            reason: None,
            method: Some(method),
            from_cache: false,
        }
    }

    pub fn undefined(reason: XirrUndefinedReason) -> Self {
        Self {
            rate: None,
            reason: Some(reason),
            method: None,
            from_cache: false,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.rate.is_some()
    }
}

/// Stored XIRR for a portfolio, or for one security when `security_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XirrCacheEntry {
    pub portfolio_id: String,
    pub security_id: Option<String>,
    pub rate: Option<Decimal>,
    pub reason: Option<XirrUndefinedReason>,
    pub method: Option<XirrMethod>,
    /// Highest transaction id that went into the calculation.
    pub last_transaction_id: i64,
    /// Wall-clock time in the valuation time zone.
    pub calculated_at: NaiveDateTime,
}

impl XirrCacheEntry {
    /// Usable while no relevant transaction newer than the cached one exists
    /// and the terminal value was taken on `today`.
    pub fn is_valid_for(&self, latest_transaction_id: Option<i64>, today: NaiveDate) -> bool {
        let ledger_unchanged = match latest_transaction_id {
            Some(latest) => latest <= self.last_transaction_id,
            None => false,
        };
        ledger_unchanged && self.calculated_at.date() == today
    }

    pub fn to_result(&self) -> XirrResult {
        XirrResult {
            rate: self.rate,
            reason: self.reason,
            method: self.method,
            from_cache: true,
        }
    }
}
