use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::parse_decimal;
use ledgerfolio_core::quotes::{DataSource, Quote};
use ledgerfolio_core::{Error, Result};

#[derive(Queryable, Insertable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct QuoteDB {
    pub security_id: String,
    pub quote_date: NaiveDate,
    pub close: String,
    pub currency: String,
    pub data_source: String,
}

impl From<&Quote> for QuoteDB {
    fn from(quote: &Quote) -> Self {
        QuoteDB {
            security_id: quote.security_id.clone(),
            quote_date: quote.quote_date,
            close: quote.close.to_string(),
            currency: quote.currency.clone(),
            data_source: quote.data_source.as_str().to_string(),
        }
    }
}

impl TryFrom<QuoteDB> for Quote {
    type Error = Error;

    fn try_from(db: QuoteDB) -> Result<Self> {
        Ok(Quote {
            close: parse_decimal("quotes.close", &db.close)?,
            data_source: DataSource::from(db.data_source.as_str()),
            security_id: db.security_id,
            quote_date: db.quote_date,
            currency: db.currency,
        })
    }
}
