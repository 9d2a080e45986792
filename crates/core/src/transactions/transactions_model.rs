//! Transaction domain models.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transactions_constants::*;
use crate::errors::{Result, ValidationError};
use crate::fx::is_valid_currency_code;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Split,
    Fee,
    Interest,
    TransferIn,
    TransferOut,
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => TRANSACTION_TYPE_BUY,
            TransactionType::Sell => TRANSACTION_TYPE_SELL,
            TransactionType::Dividend => TRANSACTION_TYPE_DIVIDEND,
            TransactionType::Split => TRANSACTION_TYPE_SPLIT,
            TransactionType::Fee => TRANSACTION_TYPE_FEE,
            TransactionType::Interest => TRANSACTION_TYPE_INTEREST,
            TransactionType::TransferIn => TRANSACTION_TYPE_TRANSFER_IN,
            TransactionType::TransferOut => TRANSACTION_TYPE_TRANSFER_OUT,
            TransactionType::Deposit => TRANSACTION_TYPE_DEPOSIT,
            TransactionType::Withdrawal => TRANSACTION_TYPE_WITHDRAWAL,
        }
    }

    /// Types that only make sense against a position.
    pub fn requires_security(&self) -> bool {
        matches!(
            self,
            TransactionType::Buy
                | TransactionType::Sell
                | TransactionType::Dividend
                | TransactionType::Split
                | TransactionType::TransferIn
                | TransactionType::TransferOut
        )
    }

    /// Types that must carry a positive quantity.
    pub fn requires_quantity(&self) -> bool {
        matches!(
            self,
            TransactionType::Buy
                | TransactionType::Sell
                | TransactionType::TransferIn
                | TransactionType::TransferOut
        )
    }

    /// Cash crossing the portfolio boundary.
    pub fn is_external_flow(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::Withdrawal)
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            TRANSACTION_TYPE_BUY => Ok(TransactionType::Buy),
            TRANSACTION_TYPE_SELL => Ok(TransactionType::Sell),
            TRANSACTION_TYPE_DIVIDEND => Ok(TransactionType::Dividend),
            TRANSACTION_TYPE_SPLIT => Ok(TransactionType::Split),
            TRANSACTION_TYPE_FEE => Ok(TransactionType::Fee),
            TRANSACTION_TYPE_INTEREST => Ok(TransactionType::Interest),
            TRANSACTION_TYPE_TRANSFER_IN => Ok(TransactionType::TransferIn),
            TRANSACTION_TYPE_TRANSFER_OUT => Ok(TransactionType::TransferOut),
            TRANSACTION_TYPE_DEPOSIT => Ok(TransactionType::Deposit),
            TRANSACTION_TYPE_WITHDRAWAL => Ok(TransactionType::Withdrawal),
            _ => Err(ValidationError::InvalidInput(format!(
                "Unknown transaction type: {}",
                s
            ))),
        }
    }
}

/// A parsed "N:M" split ratio: N new shares for every M held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRatio {
    pub numerator: Decimal,
    pub denominator: Decimal,
}

impl SplitRatio {
    pub fn multiplier(&self) -> Decimal {
        self.numerator / self.denominator
    }

    /// Scales a quantity, multiplying before dividing to keep ratios like 1:3 exact
    /// for quantities divisible by the denominator.
    pub fn scale_quantity(&self, quantity: Decimal) -> Decimal {
        quantity * self.numerator / self.denominator
    }

    pub fn scale_price(&self, price: Decimal) -> Decimal {
        price * self.denominator / self.numerator
    }
}

/// Parses an "N:M" split ratio; both sides must be positive numbers.
pub fn parse_split_ratio(ratio: &str) -> std::result::Result<SplitRatio, ValidationError> {
    let invalid = || ValidationError::InvalidSplitRatio(ratio.to_string());
    let (numerator, denominator) = ratio.split_once(SPLIT_RATIO_SEPARATOR).ok_or_else(invalid)?;
    let numerator = Decimal::from_str(numerator.trim()).map_err(|_| invalid())?;
    let denominator = Decimal::from_str(denominator.trim()).map_err(|_| invalid())?;
    if numerator <= Decimal::ZERO || denominator <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(SplitRatio {
        numerator,
        denominator,
    })
}

/// A settled ledger entry. `id` is assigned by storage in creation order and
/// breaks ties between transactions on the same date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub portfolio_id: String,
    pub security_id: Option<String>,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Flat cash amount for dividends, fees, interest and cash movements.
    pub amount: Option<Decimal>,
    pub fee: Decimal,
    /// Currency the transaction settled in; may be a minor-unit code.
    pub currency: String,
    /// Pre-resolved rate from `currency` to the portfolio base currency.
    pub fx_rate: Option<Decimal>,
    /// Pre-resolved gross amount in the portfolio base currency.
    pub base_amount: Option<Decimal>,
    pub split_ratio: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// `quantity × unit_price`, the traded value before fees.
    pub fn trade_value(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// Gross cash amount: the flat amount when present, otherwise the trade value.
    pub fn gross_amount(&self) -> Decimal {
        self.amount.unwrap_or_else(|| self.trade_value())
    }

    /// Ordering key for replay.
    pub fn replay_key(&self) -> (NaiveDate, i64) {
        (self.transaction_date, self.id)
    }
}

/// Payload for creating or correcting a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub portfolio_id: String,
    pub security_id: Option<String>,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub fee: Decimal,
    pub currency: String,
    pub fx_rate: Option<Decimal>,
    pub base_amount: Option<Decimal>,
    pub split_ratio: Option<String>,
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.portfolio_id.trim().is_empty() {
            return Err(ValidationError::MissingField("portfolio_id".to_string()).into());
        }
        if !is_valid_currency_code(&self.currency) {
            return Err(ValidationError::InvalidCurrencyCode(self.currency.clone()).into());
        }

        let kind = self.transaction_type;
        let has_security = self
            .security_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if kind.requires_security() && !has_security {
            return Err(ValidationError::MissingField("security_id".to_string()).into());
        }
        if kind.is_external_flow() && has_security {
            return Err(ValidationError::InvalidInput(format!(
                "{} cannot reference a security",
                kind.as_str()
            ))
            .into());
        }

        for (field, value) in [
            ("quantity", Some(self.quantity)),
            ("unit_price", Some(self.unit_price)),
            ("fee", Some(self.fee)),
            ("amount", self.amount),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(ValidationError::InvalidInput(format!(
                    "{} cannot be negative",
                    field
                ))
                .into());
            }
        }
        if self.fx_rate.is_some_and(|rate| rate <= Decimal::ZERO) {
            return Err(
                ValidationError::InvalidInput("fx_rate must be positive".to_string()).into(),
            );
        }

        if kind.requires_quantity() && self.quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "{} requires a positive quantity",
                kind.as_str()
            ))
            .into());
        }

        match kind {
            TransactionType::Split => {
                let ratio = self
                    .split_ratio
                    .as_deref()
                    .ok_or_else(|| ValidationError::MissingField("split_ratio".to_string()))?;
                parse_split_ratio(ratio)?;
            }
            TransactionType::Dividend
            | TransactionType::Fee
            | TransactionType::Interest
            | TransactionType::Deposit
            | TransactionType::Withdrawal => {
                let gross = self.amount.unwrap_or(self.quantity * self.unit_price);
                if gross.is_zero() && !(kind == TransactionType::Fee && !self.fee.is_zero()) {
                    return Err(ValidationError::InvalidInput(format!(
                        "{} requires an amount",
                        kind.as_str()
                    ))
                    .into());
                }
            }
            _ => {}
        }
        Ok(())
    }
}
