use chrono::NaiveDate;
use diesel::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::model::QuoteDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{quotes, securities};
use crate::utils::parse_optional_decimal;
use ledgerfolio_core::errors::{Result, ValidationError};
use ledgerfolio_core::quotes::{PriceSourceTrait, Quote, QuoteStore};

pub struct QuoteRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl QuoteRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        QuoteRepository { pool, writer }
    }
}

impl PriceSourceTrait for QuoteRepository {
    fn price_on_or_before(&self, security_id: &str, date: NaiveDate) -> Result<Option<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        quotes::table
            .filter(quotes::security_id.eq(security_id))
            .filter(quotes::quote_date.le(date))
            .order(quotes::quote_date.desc())
            .select(QuoteDB::as_select())
            .first::<QuoteDB>(&mut conn)
            .optional()
            .into_core()?
            .map(Quote::try_from)
            .transpose()
    }

    fn current_price(&self, security_id: &str) -> Result<Option<Decimal>> {
        let mut conn = get_connection(&self.pool)?;
        let raw = securities::table
            .find(security_id)
            .select(securities::current_price)
            .first::<Option<String>>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .flatten();
        parse_optional_decimal("securities.current_price", raw.as_deref())
    }
}

impl QuoteStore for QuoteRepository {
    fn save_quote(&self, quote: &Quote) -> Result<Quote> {
        if quote.close.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "quote close for {} on {} cannot be negative",
                quote.security_id, quote.quote_date
            ))
            .into());
        }
        let row = QuoteDB::from(quote);
        let saved = quote.clone();
        self.writer.exec(move |conn| {
            diesel::replace_into(quotes::table)
                .values(&row)
                .execute(conn)
                .into_core()?;
            Ok(saved)
        })
    }

    fn get_quotes_in_range(
        &self,
        security_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        quotes::table
            .filter(quotes::security_id.eq(security_id))
            .filter(quotes::quote_date.between(start, end))
            .order(quotes::quote_date.asc())
            .select(QuoteDB::as_select())
            .load::<QuoteDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Quote::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::securities::SecurityRepository;
    use ledgerfolio_core::quotes::DataSource;
    use ledgerfolio_core::securities::{NewSecurity, SecurityKind, SecurityRepositoryTrait};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quote(on: NaiveDate, close: Decimal) -> Quote {
        Quote {
            security_id: "VOD.L".to_string(),
            quote_date: on,
            close,
            currency: "GBp".to_string(),
            data_source: DataSource::Provider,
        }
    }

    fn setup(current_price: Option<Decimal>) -> (QuoteRepository, tempfile::TempDir) {
        let (pool, writer, dir) = test_db::setup();
        SecurityRepository::new(pool.clone(), writer.clone())
            .create(NewSecurity {
                id: None,
                symbol: "VOD.L".to_string(),
                name: None,
                currency: "GBp".to_string(),
                kind: SecurityKind::Equity,
                current_price,
            })
            .unwrap();
        (QuoteRepository::new(pool, writer), dir)
    }

    #[test]
    fn test_price_on_or_before_picks_latest_prior() {
        let (repo, _dir) = setup(None);
        repo.save_quote(&quote(date(2024, 1, 2), dec!(70.5))).unwrap();
        repo.save_quote(&quote(date(2024, 1, 5), dec!(72))).unwrap();

        let exact = repo.price_on_or_before("VOD.L", date(2024, 1, 5)).unwrap().unwrap();
        assert_eq!(exact.close, dec!(72));
        assert_eq!(exact.currency, "GBp");

        let prior = repo.price_on_or_before("VOD.L", date(2024, 1, 4)).unwrap().unwrap();
        assert_eq!(prior.quote_date, date(2024, 1, 2));

        assert!(repo.price_on_or_before("VOD.L", date(2024, 1, 1)).unwrap().is_none());
    }

    #[test]
    fn test_save_quote_replaces_same_day() {
        let (repo, _dir) = setup(None);
        repo.save_quote(&quote(date(2024, 1, 2), dec!(70.5))).unwrap();
        repo.save_quote(&quote(date(2024, 1, 2), dec!(71))).unwrap();

        let stored = repo
            .get_quotes_in_range("VOD.L", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].close, dec!(71));
        assert_eq!(stored[0].data_source, DataSource::Provider);
    }

    #[test]
    fn test_negative_close_rejected() {
        let (repo, _dir) = setup(None);
        assert!(repo.save_quote(&quote(date(2024, 1, 2), dec!(-1))).is_err());
    }

    #[test]
    fn test_current_price_comes_from_security() {
        let (repo, _dir) = setup(Some(dec!(69.9)));
        assert_eq!(repo.current_price("VOD.L").unwrap(), Some(dec!(69.9)));
        assert_eq!(repo.current_price("UNKNOWN").unwrap(), None);
    }
}
