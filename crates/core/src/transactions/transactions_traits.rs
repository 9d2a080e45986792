use super::transactions_model::{NewTransaction, Transaction};
use crate::errors::Result;
use chrono::NaiveDate;

/// Trait defining the contract for Transaction repository operations.
///
/// Every list method returns transactions in replay order: ascending by
/// (transaction_date, id).
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_by_id(&self, transaction_id: i64) -> Result<Transaction>;

    /// Transactions of a portfolio dated on or before `as_of` (all when `None`).
    fn list_for_portfolio(
        &self,
        portfolio_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>>;

    fn list_for_security(
        &self,
        portfolio_id: &str,
        security_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>>;

    fn earliest_transaction_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>>;

    /// Highest transaction id in the portfolio, optionally for one security.
    fn latest_transaction_id(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
    ) -> Result<Option<i64>>;

    fn create(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    fn update(&self, transaction_id: i64, update: NewTransaction) -> Result<Transaction>;

    /// Deletes and returns the removed row.
    fn delete(&self, transaction_id: i64) -> Result<Transaction>;
}

/// Write boundary for the transaction ledger. Every successful mutation
/// emits `DomainEvent::TransactionsChanged`.
pub trait TransactionServiceTrait: Send + Sync {
    fn get_transaction(&self, transaction_id: i64) -> Result<Transaction>;
    fn list_transactions(&self, portfolio_id: &str) -> Result<Vec<Transaction>>;
    fn create_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction>;
    fn update_transaction(&self, transaction_id: i64, update: NewTransaction)
        -> Result<Transaction>;
    fn delete_transaction(&self, transaction_id: i64) -> Result<Transaction>;
}
