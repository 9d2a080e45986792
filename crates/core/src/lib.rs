//! Ledgerfolio Core - Domain entities, services, and traits.
//!
//! This crate contains the portfolio ledger logic: currency normalization,
//! FIFO holdings reconstruction, valuation, daily value history and
//! money-weighted returns. It is database-agnostic and defines traits that
//! are implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod events;
pub mod fx;
pub mod jobs;
pub mod portfolio;
pub mod portfolios;
pub mod quotes;
pub mod securities;
pub mod settings;
pub mod transactions;
pub mod utils;

// Re-export common types from the portfolio module
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

#[cfg(test)]
pub(crate) mod test_support;
