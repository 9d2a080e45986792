//! Derived portfolio state: holdings, valuations, value history and returns.

pub mod history;
pub mod holdings;
pub mod performance;
pub mod valuation;
