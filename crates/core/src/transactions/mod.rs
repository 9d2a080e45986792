//! Transactions module - the ledger and its write boundary.

pub mod transactions_constants;
mod transactions_model;
mod transactions_service;
mod transactions_traits;

pub use transactions_model::{
    parse_split_ratio, NewTransaction, SplitRatio, Transaction, TransactionType,
};
pub use transactions_service::TransactionService;
pub use transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
