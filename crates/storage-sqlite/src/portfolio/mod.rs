pub mod history;
pub mod performance;
