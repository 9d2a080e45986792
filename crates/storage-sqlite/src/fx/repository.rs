use chrono::NaiveDate;
use diesel::prelude::*;
use log::debug;
use std::sync::Arc;

use super::model::{ExchangeRateDB, NewExchangeRateDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{not_found, IntoCore};
use crate::schema::exchange_rates;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::fx::{ExchangeRate, FxRepositoryTrait, NewExchangeRate};

#[derive(Clone)]
pub struct FxRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl FxRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

impl FxRepositoryTrait for FxRepository {
    fn get_rate_on_or_before(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>> {
        let mut conn = get_connection(&self.pool)?;
        exchange_rates::table
            .filter(exchange_rates::from_currency.eq(from))
            .filter(exchange_rates::to_currency.eq(to))
            .filter(exchange_rates::rate_date.le(date))
            .order(exchange_rates::rate_date.desc())
            .select(ExchangeRateDB::as_select())
            .first::<ExchangeRateDB>(&mut conn)
            .optional()
            .into_core()?
            .map(ExchangeRate::try_from)
            .transpose()
    }

    fn get_rate_history(&self, from: &str, to: &str) -> Result<Vec<ExchangeRate>> {
        let mut conn = get_connection(&self.pool)?;
        exchange_rates::table
            .filter(exchange_rates::from_currency.eq(from))
            .filter(exchange_rates::to_currency.eq(to))
            .order(exchange_rates::rate_date.asc())
            .select(ExchangeRateDB::as_select())
            .load::<ExchangeRateDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(ExchangeRate::try_from)
            .collect()
    }

    fn save_exchange_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate> {
        rate.validate()?;
        let row = NewExchangeRateDB::from(rate);
        self.writer.exec(move |conn| {
            debug!(
                "Saving {} rate {} for {}",
                ExchangeRate::pair_key(&row.from_currency, &row.to_currency),
                row.rate,
                row.rate_date
            );
            diesel::insert_into(exchange_rates::table)
                .values(&row)
                .on_conflict((
                    exchange_rates::from_currency,
                    exchange_rates::to_currency,
                    exchange_rates::rate_date,
                ))
                .do_update()
                .set(&row)
                .returning(ExchangeRateDB::as_returning())
                .get_result::<ExchangeRateDB>(conn)
                .into_core()?
                .try_into()
        })
    }

    fn delete_exchange_rate(&self, rate_id: i64) -> Result<()> {
        self.writer.exec(move |conn| {
            let deleted = diesel::delete(exchange_rates::table.find(rate_id))
                .execute(conn)
                .into_core()?;
            if deleted == 0 {
                return Err(not_found(format!("exchange rate {}", rate_id)));
            }
            Ok(())
        })
    }
}
