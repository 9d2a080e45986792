//! Database models for ledger transactions.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{optional_decimal_text, parse_decimal, parse_optional_decimal};
use ledgerfolio_core::transactions::{NewTransaction, Transaction};
use ledgerfolio_core::{Error, Result};

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TransactionDB {
    pub id: i64,
    pub portfolio_id: String,
    pub security_id: Option<String>,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub quantity: String,
    pub unit_price: String,
    pub amount: Option<String>,
    pub fee: String,
    pub currency: String,
    pub fx_rate: Option<String>,
    pub base_amount: Option<String>,
    pub split_ratio: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insert and update payload; `id` is assigned by SQLite.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(treat_none_as_null = true)]
pub struct NewTransactionDB {
    pub portfolio_id: String,
    pub security_id: Option<String>,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub quantity: String,
    pub unit_price: String,
    pub amount: Option<String>,
    pub fee: String,
    pub currency: String,
    pub fx_rate: Option<String>,
    pub base_amount: Option<String>,
    pub split_ratio: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewTransactionDB {
    pub fn from_domain(new_transaction: NewTransaction, now: NaiveDateTime) -> Self {
        NewTransactionDB {
            portfolio_id: new_transaction.portfolio_id,
            security_id: new_transaction.security_id,
            transaction_type: new_transaction.transaction_type.as_str().to_string(),
            transaction_date: new_transaction.transaction_date,
            quantity: new_transaction.quantity.to_string(),
            unit_price: new_transaction.unit_price.to_string(),
            amount: optional_decimal_text(new_transaction.amount),
            fee: new_transaction.fee.to_string(),
            currency: new_transaction.currency,
            fx_rate: optional_decimal_text(new_transaction.fx_rate),
            base_amount: optional_decimal_text(new_transaction.base_amount),
            split_ratio: new_transaction.split_ratio,
            notes: new_transaction.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self> {
        let transaction_type = db.transaction_type.parse().map_err(|_| {
            Error::from(StorageError::CorruptValue(format!(
                "transactions.transaction_type = '{}' for {}",
                db.transaction_type, db.id
            )))
        })?;
        Ok(Transaction {
            id: db.id,
            transaction_type,
            transaction_date: db.transaction_date,
            quantity: parse_decimal("transactions.quantity", &db.quantity)?,
            unit_price: parse_decimal("transactions.unit_price", &db.unit_price)?,
            amount: parse_optional_decimal("transactions.amount", db.amount.as_deref())?,
            fee: parse_decimal("transactions.fee", &db.fee)?,
            fx_rate: parse_optional_decimal("transactions.fx_rate", db.fx_rate.as_deref())?,
            base_amount: parse_optional_decimal(
                "transactions.base_amount",
                db.base_amount.as_deref(),
            )?,
            portfolio_id: db.portfolio_id,
            security_id: db.security_id,
            currency: db.currency,
            split_ratio: db.split_ratio,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
