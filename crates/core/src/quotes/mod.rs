//! Quote module - daily prices and the valuation price fallback chain.

pub mod model;
mod price_resolver;
pub mod store;

pub use model::{DataSource, PriceOrigin, Quote, ResolvedPrice};
pub use price_resolver::resolve_price;
pub use store::{PriceSourceTrait, QuoteStore};
