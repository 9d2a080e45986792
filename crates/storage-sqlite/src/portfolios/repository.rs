use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::model::{CashLedgerDB, PortfolioDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{not_found, IntoCore};
use crate::schema::{cash_ledger, portfolios};
use crate::utils::parse_decimal;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::portfolios::{
    CashLedgerEntry, CashLedgerTrait, NewPortfolio, Portfolio, PortfolioRepositoryTrait,
};

pub struct PortfolioRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PortfolioRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PortfolioRepository { pool, writer }
    }
}

impl PortfolioRepositoryTrait for PortfolioRepository {
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)?;
        portfolios::table
            .find(portfolio_id)
            .select(PortfolioDB::as_select())
            .first::<PortfolioDB>(&mut conn)
            .optional()
            .into_core()?
            .map(Portfolio::from)
            .ok_or_else(|| not_found(format!("portfolio {}", portfolio_id)))
    }

    fn list(&self) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = portfolios::table
            .select(PortfolioDB::as_select())
            .order(portfolios::name.asc())
            .load::<PortfolioDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Portfolio::from).collect())
    }

    fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        new_portfolio.validate()?;
        let now = Utc::now().naive_utc();
        let row = PortfolioDB {
            id: new_portfolio
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new_portfolio.name.trim().to_string(),
            base_currency: new_portfolio.base_currency,
            created_at: now,
            updated_at: now,
        };

        self.writer.exec(move |conn| {
            diesel::insert_into(portfolios::table)
                .values(&row)
                .execute(conn)
                .into_core()?;
            Ok(Portfolio::from(row))
        })
    }
}

pub struct CashLedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CashLedgerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        CashLedgerRepository { pool, writer }
    }
}

impl CashLedgerTrait for CashLedgerRepository {
    fn balance_as_of(&self, portfolio_id: &str, date: NaiveDate) -> Result<Option<Decimal>> {
        let mut conn = get_connection(&self.pool)?;
        let latest = cash_ledger::table
            .filter(cash_ledger::portfolio_id.eq(portfolio_id))
            .filter(cash_ledger::entry_date.le(date))
            .order(cash_ledger::entry_date.desc())
            .select(cash_ledger::balance)
            .first::<String>(&mut conn)
            .optional()
            .into_core()?;
        latest
            .map(|raw| parse_decimal("cash_ledger.balance", &raw))
            .transpose()
    }

    fn record_balance(&self, entry: CashLedgerEntry) -> Result<()> {
        let row = CashLedgerDB {
            portfolio_id: entry.portfolio_id,
            entry_date: entry.entry_date,
            balance: entry.balance.to_string(),
        };
        self.writer.exec(move |conn| {
            diesel::replace_into(cash_ledger::table)
                .values(&row)
                .execute(conn)
                .into_core()?;
            Ok(())
        })
    }
}
