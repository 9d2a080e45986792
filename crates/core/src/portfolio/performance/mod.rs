//! Money-weighted returns (XIRR) with a per-portfolio result cache.

mod flow_classifier;
pub mod performance_model;
pub mod performance_service;
mod performance_traits;
pub mod xirr;

pub use flow_classifier::{
    classify_flow, is_external_flow, portfolio_flow_scope, signed_flow_amount, FlowScope,
    FlowType,
};
pub use performance_model::*;
pub use performance_service::*;
pub use performance_traits::XirrCacheRepositoryTrait;
pub use xirr::XirrSolver;
