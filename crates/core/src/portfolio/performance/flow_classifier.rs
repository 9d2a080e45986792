//! Flow classification for money-weighted returns.
//!
//! Only external flows (money or securities crossing the portfolio boundary)
//! are XIRR flows at portfolio level. A ledger without any DEPOSIT/WITHDRAWAL
//! records falls back to trade flows.

use rust_decimal::Decimal;

use crate::transactions::{Transaction, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Money crossing the portfolio boundary.
    External,
    /// Money moving between cash and positions inside the portfolio.
    Internal,
}

/// Which flows make up the XIRR series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowScope {
    /// Deposits, withdrawals and security transfers.
    ExternalCash,
    /// Buys, sells, income, fees and transfers, for ledgers that never
    /// record deposits, and for single assets.
    Trades,
}

pub fn classify_flow(transaction: &Transaction) -> FlowType {
    if transaction.transaction_type.is_external_flow() {
        FlowType::External
    } else {
        FlowType::Internal
    }
}

pub fn is_external_flow(transaction: &Transaction) -> bool {
    classify_flow(transaction) == FlowType::External
}

/// Portfolio-level scope for a ledger.
pub fn portfolio_flow_scope(transactions: &[Transaction]) -> FlowScope {
    if transactions.iter().any(is_external_flow) {
        FlowScope::ExternalCash
    } else {
        FlowScope::Trades
    }
}

/// Signed investor-side amount of a transaction in its own currency, or
/// `None` when it is not a flow under `scope`.
pub fn signed_flow_amount(transaction: &Transaction, scope: FlowScope) -> Option<Decimal> {
    let gross = transaction.gross_amount();
    let fee = transaction.fee;
    let amount = match (scope, transaction.transaction_type) {
        (FlowScope::ExternalCash, TransactionType::Deposit) => -gross,
        (FlowScope::ExternalCash, TransactionType::Withdrawal) => gross,
        // Securities moved in or out cross the boundary too. Their fee is
        // debited from portfolio cash, which the terminal value already holds.
        (FlowScope::ExternalCash, TransactionType::TransferIn) => -gross,
        (FlowScope::ExternalCash, TransactionType::TransferOut) => gross,
        (FlowScope::ExternalCash, _) => return None,
        (FlowScope::Trades, TransactionType::Buy) => -(gross + fee),
        (FlowScope::Trades, TransactionType::TransferIn) => -(gross + fee),
        (FlowScope::Trades, TransactionType::Sell) => gross - fee,
        (FlowScope::Trades, TransactionType::TransferOut) => gross - fee,
        (FlowScope::Trades, TransactionType::Dividend | TransactionType::Interest) => gross - fee,
        (FlowScope::Trades, TransactionType::Fee) => {
            -(transaction.amount.unwrap_or(Decimal::ZERO) + fee)
        }
        (FlowScope::Trades, _) => return None,
    };
    (!amount.is_zero()).then_some(amount)
}
