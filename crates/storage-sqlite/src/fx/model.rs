use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::parse_decimal;
use ledgerfolio_core::fx::{ExchangeRate, NewExchangeRate};
use ledgerfolio_core::{Error, Result};

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::exchange_rates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateDB {
    pub id: i64,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub rate_date: NaiveDate,
    pub source: String,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::exchange_rates)]
pub struct NewExchangeRateDB {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub rate_date: NaiveDate,
    pub source: String,
}

impl From<NewExchangeRate> for NewExchangeRateDB {
    fn from(rate: NewExchangeRate) -> Self {
        NewExchangeRateDB {
            from_currency: rate.from_currency,
            to_currency: rate.to_currency,
            rate: rate.rate.to_string(),
            rate_date: rate.rate_date,
            source: rate.source.as_str().to_string(),
        }
    }
}

impl TryFrom<ExchangeRateDB> for ExchangeRate {
    type Error = Error;

    fn try_from(db: ExchangeRateDB) -> Result<Self> {
        Ok(ExchangeRate {
            id: db.id,
            rate: parse_decimal("exchange_rates.rate", &db.rate)?,
            source: db.source.parse()?,
            from_currency: db.from_currency,
            to_currency: db.to_currency,
            rate_date: db.rate_date,
        })
    }
}
