use std::sync::Arc;

use super::transactions_model::{NewTransaction, Transaction};
use super::transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
use crate::errors::{CalculatorError, Result};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::portfolios::PortfolioRepositoryTrait;
use crate::securities::SecurityRepositoryTrait;

/// Validates ledger writes and announces them to the event sink.
pub struct TransactionService {
    repository: Arc<dyn TransactionRepositoryTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    security_repository: Arc<dyn SecurityRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl TransactionService {
    pub fn new(
        repository: Arc<dyn TransactionRepositoryTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        security_repository: Arc<dyn SecurityRepositoryTrait>,
    ) -> Self {
        Self {
            repository,
            portfolio_repository,
            security_repository,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    fn check_references(&self, new_transaction: &NewTransaction) -> Result<()> {
        self.portfolio_repository
            .get_by_id(&new_transaction.portfolio_id)
            .map_err(|_| CalculatorError::UnknownPortfolio(new_transaction.portfolio_id.clone()))?;
        if let Some(security_id) = new_transaction.security_id.as_deref() {
            self.security_repository.get_by_id(security_id)?;
        }
        Ok(())
    }

    fn emit_change(&self, touched: &[&Transaction]) {
        let Some(earliest_date) = touched.iter().map(|t| t.transaction_date).min() else {
            return;
        };
        let portfolio_ids = touched.iter().map(|t| t.portfolio_id.clone()).collect();
        let security_ids = touched
            .iter()
            .filter_map(|t| t.security_id.clone())
            .collect();
        self.event_sink.emit(DomainEvent::transactions_changed(
            portfolio_ids,
            security_ids,
            earliest_date,
        ));
    }
}

impl TransactionServiceTrait for TransactionService {
    fn get_transaction(&self, transaction_id: i64) -> Result<Transaction> {
        self.repository.get_by_id(transaction_id)
    }

    fn list_transactions(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        self.repository.list_for_portfolio(portfolio_id, None)
    }

    fn create_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        new_transaction.validate()?;
        self.check_references(&new_transaction)?;

        let created = self.repository.create(new_transaction)?;
        log::debug!(
            "Created {} transaction {} in portfolio {}",
            created.transaction_type.as_str(),
            created.id,
            created.portfolio_id
        );
        self.emit_change(&[&created]);
        Ok(created)
    }

    fn update_transaction(
        &self,
        transaction_id: i64,
        update: NewTransaction,
    ) -> Result<Transaction> {
        update.validate()?;
        self.check_references(&update)?;

        let previous = self.repository.get_by_id(transaction_id)?;
        let updated = self.repository.update(transaction_id, update)?;
        self.emit_change(&[&previous, &updated]);
        Ok(updated)
    }

    fn delete_transaction(&self, transaction_id: i64) -> Result<Transaction> {
        let deleted = self.repository.delete(transaction_id)?;
        log::debug!(
            "Deleted transaction {} from portfolio {}",
            deleted.id,
            deleted.portfolio_id
        );
        self.emit_change(&[&deleted]);
        Ok(deleted)
    }
}
