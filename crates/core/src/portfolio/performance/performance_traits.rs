use super::performance_model::XirrCacheEntry;
use crate::errors::Result;

/// Storage for cached XIRR results.
pub trait XirrCacheRepositoryTrait: Send + Sync {
    /// Entry for the portfolio (`security_id == None`) or one of its securities.
    fn get_entry(&self, portfolio_id: &str, security_id: Option<&str>)
        -> Result<Option<XirrCacheEntry>>;

    /// Inserts or replaces the entry for its (portfolio, security) key.
    fn save_entry(&self, entry: &XirrCacheEntry) -> Result<()>;

    /// Drops every entry of the portfolio, security-level ones included.
    fn invalidate_portfolio(&self, portfolio_id: &str) -> Result<usize>;
}
