//! Database model for securities.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::parse_optional_decimal;
use ledgerfolio_core::securities::Security;
use ledgerfolio_core::{Error, Result};

#[derive(Queryable, Insertable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::securities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SecurityDB {
    pub id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub currency: String,
    pub kind: String,
    pub current_price: Option<String>,
    pub price_updated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<SecurityDB> for Security {
    type Error = Error;

    fn try_from(db: SecurityDB) -> Result<Self> {
        let kind = db.kind.parse().map_err(|_| {
            Error::from(StorageError::CorruptValue(format!(
                "securities.kind = '{}' for {}",
                db.kind, db.id
            )))
        })?;
        Ok(Security {
            current_price: parse_optional_decimal(
                "securities.current_price",
                db.current_price.as_deref(),
            )?,
            id: db.id,
            symbol: db.symbol,
            name: db.name,
            currency: db.currency,
            kind,
            price_updated_at: db.price_updated_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
