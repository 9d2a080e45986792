//! Database model for portfolio value snapshots.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::parse_decimal;
use ledgerfolio_core::portfolio::history::PortfolioValueSnapshot;
use ledgerfolio_core::{Error, Result};

/// Row of `portfolio_value_history`. The surrogate `id` is never exposed;
/// rows are addressed by (portfolio_id, snapshot_date).
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolio_value_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValueSnapshotDB {
    pub id: i64,
    pub portfolio_id: String,
    pub snapshot_date: NaiveDate,
    pub total_value: String,
    pub total_cost: String,
    pub cash_balance: String,
    pub holdings_count: i64,
    pub unrealized_gain: String,
    pub return_pct: String,
    pub source: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolio_value_history)]
pub struct NewSnapshotDB {
    pub portfolio_id: String,
    pub snapshot_date: NaiveDate,
    pub total_value: String,
    pub total_cost: String,
    pub cash_balance: String,
    pub holdings_count: i64,
    pub unrealized_gain: String,
    pub return_pct: String,
    pub source: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&PortfolioValueSnapshot> for NewSnapshotDB {
    fn from(snapshot: &PortfolioValueSnapshot) -> Self {
        NewSnapshotDB {
            portfolio_id: snapshot.portfolio_id.clone(),
            snapshot_date: snapshot.snapshot_date,
            total_value: snapshot.total_value.to_string(),
            total_cost: snapshot.total_cost.to_string(),
            cash_balance: snapshot.cash_balance.to_string(),
            holdings_count: snapshot.holdings_count,
            unrealized_gain: snapshot.unrealized_gain.to_string(),
            return_pct: snapshot.return_pct.to_string(),
            source: snapshot.source.as_str().to_string(),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }
}

impl TryFrom<PortfolioValueSnapshotDB> for PortfolioValueSnapshot {
    type Error = Error;

    fn try_from(db: PortfolioValueSnapshotDB) -> Result<Self> {
        Ok(PortfolioValueSnapshot {
            total_value: parse_decimal("portfolio_value_history.total_value", &db.total_value)?,
            total_cost: parse_decimal("portfolio_value_history.total_cost", &db.total_cost)?,
            cash_balance: parse_decimal("portfolio_value_history.cash_balance", &db.cash_balance)?,
            unrealized_gain: parse_decimal(
                "portfolio_value_history.unrealized_gain",
                &db.unrealized_gain,
            )?,
            return_pct: parse_decimal("portfolio_value_history.return_pct", &db.return_pct)?,
            source: db.source.parse()?,
            portfolio_id: db.portfolio_id,
            snapshot_date: db.snapshot_date,
            holdings_count: db.holdings_count,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
