use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::utils::{optional_decimal_text, parse_optional_decimal};
use ledgerfolio_core::portfolio::performance::XirrCacheEntry;
use ledgerfolio_core::{Error, Result};

/// Key used for the portfolio-level row, which has no security.
pub(crate) const PORTFOLIO_SECURITY_KEY: &str = "";

pub(crate) fn security_key(security_id: Option<&str>) -> &str {
    security_id.unwrap_or(PORTFOLIO_SECURITY_KEY)
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::xirr_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct XirrCacheDB {
    pub portfolio_id: String,
    pub security_key: String,
    pub rate: Option<String>,
    pub reason: Option<String>,
    pub method: Option<String>,
    pub last_transaction_id: i64,
    pub calculated_at: NaiveDateTime,
}

impl From<&XirrCacheEntry> for XirrCacheDB {
    fn from(entry: &XirrCacheEntry) -> Self {
        XirrCacheDB {
            portfolio_id: entry.portfolio_id.clone(),
            security_key: security_key(entry.security_id.as_deref()).to_string(),
            rate: optional_decimal_text(entry.rate),
            reason: entry.reason.map(|r| r.as_str().to_string()),
            method: entry.method.map(|m| m.as_str().to_string()),
            last_transaction_id: entry.last_transaction_id,
            calculated_at: entry.calculated_at,
        }
    }
}

impl TryFrom<XirrCacheDB> for XirrCacheEntry {
    type Error = Error;

    fn try_from(db: XirrCacheDB) -> Result<Self> {
        Ok(XirrCacheEntry {
            rate: parse_optional_decimal("xirr_cache.rate", db.rate.as_deref())?,
            reason: db.reason.as_deref().map(str::parse).transpose()?,
            method: db.method.as_deref().map(str::parse).transpose()?,
            security_id: Some(db.security_key).filter(|key| key != PORTFOLIO_SECURITY_KEY),
            portfolio_id: db.portfolio_id,
            last_transaction_id: db.last_transaction_id,
            calculated_at: db.calculated_at,
        })
    }
}
