//! FX (Foreign Exchange) module - rate resolution, minor-unit handling, and traits.

pub mod currency;
mod fx_errors;
mod fx_model;
mod fx_service;
mod fx_traits;
mod rate_cache;
mod rate_resolver;

pub use currency::{
    from_major_multiplier, is_valid_currency_code, minor_unit_rule, normalize_amount,
    normalize_currency_code, to_major_multiplier, MinorUnitRule,
};
pub use fx_errors::FxError;
pub use fx_model::{ExchangeRate, NewExchangeRate, RateSource};
pub use fx_service::FxService;
pub use fx_traits::{ExchangeRateProviderTrait, FxRepositoryTrait, FxServiceTrait};
pub use rate_cache::RateCache;
pub use rate_resolver::{DirectRate, InverseRate, RateResolver, RateStrategy, TriangulatedRate};

#[cfg(test)]
mod fx_service_tests;
