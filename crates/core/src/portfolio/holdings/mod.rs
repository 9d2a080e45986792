//! Holdings module - FIFO replay of the ledger into valued positions.

mod holdings_calculator;
mod holdings_model;
mod holdings_service;

pub use holdings_calculator::{
    rate_with_fallback, transaction_base_rate, HoldingsCalculator, RateLookup,
};
pub use holdings_model::*;
pub use holdings_service::{HoldingsService, HoldingsServiceTrait};

#[cfg(test)]
mod holdings_calculator_tests;
