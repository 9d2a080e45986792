use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::sync::Arc;

use super::model::{NewSnapshotDB, PortfolioValueSnapshotDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::portfolio_value_history::dsl as pvh;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::portfolio::history::{PortfolioValueSnapshot, SnapshotRepositoryTrait};

pub struct SnapshotRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SnapshotRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SnapshotRepository { pool, writer }
    }
}

impl SnapshotRepositoryTrait for SnapshotRepository {
    fn get_snapshot(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<Option<PortfolioValueSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        pvh::portfolio_value_history
            .filter(pvh::portfolio_id.eq(portfolio_id))
            .filter(pvh::snapshot_date.eq(date))
            .select(PortfolioValueSnapshotDB::as_select())
            .first::<PortfolioValueSnapshotDB>(&mut conn)
            .optional()
            .into_core()?
            .map(PortfolioValueSnapshot::try_from)
            .transpose()
    }

    fn get_snapshots_in_range(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioValueSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        pvh::portfolio_value_history
            .filter(pvh::portfolio_id.eq(portfolio_id))
            .filter(pvh::snapshot_date.between(start, end))
            .order(pvh::snapshot_date.asc())
            .select(PortfolioValueSnapshotDB::as_select())
            .load::<PortfolioValueSnapshotDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(PortfolioValueSnapshot::try_from)
            .collect()
    }

    fn get_snapshot_dates(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;
        pvh::portfolio_value_history
            .filter(pvh::portfolio_id.eq(portfolio_id))
            .filter(pvh::snapshot_date.between(start, end))
            .order(pvh::snapshot_date.asc())
            .select(pvh::snapshot_date)
            .load::<NaiveDate>(&mut conn)
            .into_core()
    }

    fn upsert_snapshot(&self, snapshot: &PortfolioValueSnapshot) -> Result<bool> {
        let mut stored = snapshot.clone();
        stored.recompute_derived();
        let row = NewSnapshotDB::from(&stored);

        self.writer.exec(move |conn| {
            let existing: i64 = pvh::portfolio_value_history
                .filter(pvh::portfolio_id.eq(&row.portfolio_id))
                .filter(pvh::snapshot_date.eq(row.snapshot_date))
                .count()
                .get_result(conn)
                .into_core()?;

            // created_at is left out of the update set so the first write's stamp survives.
            diesel::insert_into(pvh::portfolio_value_history)
                .values(&row)
                .on_conflict((pvh::portfolio_id, pvh::snapshot_date))
                .do_update()
                .set((
                    pvh::total_value.eq(excluded(pvh::total_value)),
                    pvh::total_cost.eq(excluded(pvh::total_cost)),
                    pvh::cash_balance.eq(excluded(pvh::cash_balance)),
                    pvh::holdings_count.eq(excluded(pvh::holdings_count)),
                    pvh::unrealized_gain.eq(excluded(pvh::unrealized_gain)),
                    pvh::return_pct.eq(excluded(pvh::return_pct)),
                    pvh::source.eq(excluded(pvh::source)),
                    pvh::updated_at.eq(excluded(pvh::updated_at)),
                ))
                .execute(conn)
                .into_core()?;

            Ok(existing == 0)
        })
    }

    fn delete_snapshots_from(&self, portfolio_id: &str, from: NaiveDate) -> Result<usize> {
        let portfolio_id = portfolio_id.to_string();
        self.writer.exec(move |conn| {
            diesel::delete(
                pvh::portfolio_value_history
                    .filter(pvh::portfolio_id.eq(&portfolio_id))
                    .filter(pvh::snapshot_date.ge(from)),
            )
            .execute(conn)
            .into_core()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::portfolios::PortfolioRepository;
    use chrono::{Duration, NaiveDateTime};
    use ledgerfolio_core::portfolio::history::SnapshotSource;
    use ledgerfolio_core::portfolios::{NewPortfolio, PortfolioRepositoryTrait};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stamp(d: NaiveDate, hour: u32) -> NaiveDateTime {
        d.and_hms_opt(hour, 0, 0).unwrap()
    }

    fn create_test_repository() -> (SnapshotRepository, tempfile::TempDir) {
        let (pool, writer, dir) = test_db::setup();
        PortfolioRepository::new(pool.clone(), writer.clone())
            .create(NewPortfolio {
                id: Some("p1".to_string()),
                name: "Main".to_string(),
                base_currency: "USD".to_string(),
            })
            .unwrap();
        (SnapshotRepository::new(pool, writer), dir)
    }

    fn snapshot(
        on: NaiveDate,
        total_value: Decimal,
        source: SnapshotSource,
    ) -> PortfolioValueSnapshot {
        PortfolioValueSnapshot {
            portfolio_id: "p1".to_string(),
            snapshot_date: on,
            total_value,
            total_cost: dec!(1000),
            cash_balance: dec!(0),
            holdings_count: 1,
            unrealized_gain: Decimal::ZERO,
            return_pct: Decimal::ZERO,
            source,
            created_at: stamp(on, 18),
            updated_at: stamp(on, 18),
        }
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let (repo, _dir) = create_test_repository();
        let day = date(2024, 3, 1);

        let created = repo
            .upsert_snapshot(&snapshot(day, dec!(1100), SnapshotSource::Daily))
            .unwrap();
        assert!(created);

        let mut rewrite = snapshot(day, dec!(1200), SnapshotSource::Manual);
        rewrite.created_at = stamp(day, 23);
        rewrite.updated_at = stamp(day, 23);
        let created = repo.upsert_snapshot(&rewrite).unwrap();
        assert!(!created);

        let stored = repo.get_snapshot("p1", day).unwrap().unwrap();
        assert_eq!(stored.total_value, dec!(1200));
        assert_eq!(stored.source, SnapshotSource::Manual);
        assert_eq!(stored.created_at, stamp(day, 18));
        assert_eq!(stored.updated_at, stamp(day, 23));
        assert_eq!(repo.get_snapshot_dates("p1", day, day).unwrap().len(), 1);
    }

    #[test]
    fn test_derived_columns_are_recomputed() {
        let (repo, _dir) = create_test_repository();
        let day = date(2024, 3, 1);
        let mut stale = snapshot(day, dec!(1100), SnapshotSource::Daily);
        stale.unrealized_gain = dec!(999);
        stale.return_pct = dec!(-5);

        repo.upsert_snapshot(&stale).unwrap();
        let stored = repo.get_snapshot("p1", day).unwrap().unwrap();
        assert_eq!(stored.unrealized_gain, dec!(100));
        assert_eq!(stored.return_pct, dec!(10));
    }

    #[test]
    fn test_range_queries_are_ascending() {
        let (repo, _dir) = create_test_repository();
        let start = date(2024, 3, 1);
        for offset in [4, 0, 2] {
            let day = start + Duration::days(offset);
            repo.upsert_snapshot(&snapshot(day, dec!(1000), SnapshotSource::Backfill))
                .unwrap();
        }

        let dates = repo
            .get_snapshot_dates("p1", start, start + Duration::days(3))
            .unwrap();
        assert_eq!(dates, vec![start, start + Duration::days(2)]);

        let rows = repo
            .get_snapshots_in_range("p1", start, start + Duration::days(10))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].snapshot_date < w[1].snapshot_date));
    }

    #[test]
    fn test_delete_snapshots_from_date() {
        let (repo, _dir) = create_test_repository();
        let start = date(2024, 3, 1);
        for offset in 0..5 {
            let day = start + Duration::days(offset);
            repo.upsert_snapshot(&snapshot(day, dec!(1000), SnapshotSource::Daily))
                .unwrap();
        }

        let removed = repo
            .delete_snapshots_from("p1", start + Duration::days(3))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            repo.get_snapshot_dates("p1", start, start + Duration::days(10))
                .unwrap()
                .len(),
            3
        );
    }
}
