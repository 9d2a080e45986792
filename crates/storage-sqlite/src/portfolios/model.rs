//! Database models for portfolios.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledgerfolio_core::portfolios::Portfolio;

#[derive(Queryable, Insertable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDB {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<PortfolioDB> for Portfolio {
    fn from(db: PortfolioDB) -> Self {
        Portfolio {
            id: db.id,
            name: db.name,
            base_currency: db.base_currency,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::cash_ledger)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CashLedgerDB {
    pub portfolio_id: String,
    pub entry_date: NaiveDate,
    pub balance: String,
}
