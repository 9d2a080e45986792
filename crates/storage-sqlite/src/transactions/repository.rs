use chrono::{NaiveDate, Utc};
use diesel::dsl::{max, min};
use diesel::prelude::*;
use std::sync::Arc;

use super::model::{NewTransactionDB, TransactionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{not_found, IntoCore};
use crate::schema::transactions;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::transactions::{NewTransaction, Transaction, TransactionRepositoryTrait};

pub struct TransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        TransactionRepository { pool, writer }
    }
}

fn load_transaction(conn: &mut SqliteConnection, transaction_id: i64) -> Result<TransactionDB> {
    transactions::table
        .find(transaction_id)
        .select(TransactionDB::as_select())
        .first::<TransactionDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| not_found(format!("transaction {}", transaction_id)))
}

fn into_domain(rows: Vec<TransactionDB>) -> Result<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

impl TransactionRepositoryTrait for TransactionRepository {
    fn get_by_id(&self, transaction_id: i64) -> Result<Transaction> {
        let mut conn = get_connection(&self.pool)?;
        load_transaction(&mut conn, transaction_id)?.try_into()
    }

    fn list_for_portfolio(
        &self,
        portfolio_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .into_boxed();
        if let Some(as_of) = as_of {
            query = query.filter(transactions::transaction_date.le(as_of));
        }
        let rows = query
            .order((transactions::transaction_date.asc(), transactions::id.asc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;
        into_domain(rows)
    }

    fn list_for_security(
        &self,
        portfolio_id: &str,
        security_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .filter(transactions::security_id.eq(security_id))
            .into_boxed();
        if let Some(as_of) = as_of {
            query = query.filter(transactions::transaction_date.le(as_of));
        }
        let rows = query
            .order((transactions::transaction_date.asc(), transactions::id.asc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;
        into_domain(rows)
    }

    fn earliest_transaction_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;
        transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .select(min(transactions::transaction_date))
            .first::<Option<NaiveDate>>(&mut conn)
            .into_core()
    }

    fn latest_transaction_id(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
    ) -> Result<Option<i64>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .into_boxed();
        if let Some(security_id) = security_id {
            query = query.filter(transactions::security_id.eq(security_id));
        }
        query
            .select(max(transactions::id))
            .first::<Option<i64>>(&mut conn)
            .into_core()
    }

    fn create(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        let row = NewTransactionDB::from_domain(new_transaction, Utc::now().naive_utc());
        self.writer.exec(move |conn| {
            diesel::insert_into(transactions::table)
                .values(&row)
                .returning(TransactionDB::as_returning())
                .get_result::<TransactionDB>(conn)
                .into_core()?
                .try_into()
        })
    }

    fn update(&self, transaction_id: i64, update: NewTransaction) -> Result<Transaction> {
        let mut row = NewTransactionDB::from_domain(update, Utc::now().naive_utc());
        self.writer.exec(move |conn| {
            let existing = load_transaction(conn, transaction_id)?;
            row.created_at = existing.created_at;
            diesel::update(transactions::table.find(transaction_id))
                .set(&row)
                .returning(TransactionDB::as_returning())
                .get_result::<TransactionDB>(conn)
                .into_core()?
                .try_into()
        })
    }

    fn delete(&self, transaction_id: i64) -> Result<Transaction> {
        self.writer.exec(move |conn| {
            let existing = load_transaction(conn, transaction_id)?;
            diesel::delete(transactions::table.find(transaction_id))
                .execute(conn)
                .into_core()?;
            existing.try_into()
        })
    }
}
