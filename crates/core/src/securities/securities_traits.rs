use super::securities_model::{NewSecurity, Security};
use crate::errors::Result;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Trait defining the contract for Security repository operations.
pub trait SecurityRepositoryTrait: Send + Sync {
    fn get_by_id(&self, security_id: &str) -> Result<Security>;
    fn list(&self) -> Result<Vec<Security>>;
    fn list_by_ids(&self, security_ids: &[String]) -> Result<Vec<Security>>;
    fn create(&self, new_security: NewSecurity) -> Result<Security>;
    /// Records a refreshed market price.
    fn update_current_price(
        &self,
        security_id: &str,
        price: Decimal,
        as_of: NaiveDateTime,
    ) -> Result<Security>;
}
