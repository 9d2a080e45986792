use diesel::prelude::*;
use std::sync::Arc;

use super::model::{security_key, XirrCacheDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::xirr_cache;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::portfolio::performance::{XirrCacheEntry, XirrCacheRepositoryTrait};

pub struct XirrCacheRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl XirrCacheRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        XirrCacheRepository { pool, writer }
    }
}

impl XirrCacheRepositoryTrait for XirrCacheRepository {
    fn get_entry(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
    ) -> Result<Option<XirrCacheEntry>> {
        let mut conn = get_connection(&self.pool)?;
        xirr_cache::table
            .find((portfolio_id, security_key(security_id)))
            .select(XirrCacheDB::as_select())
            .first::<XirrCacheDB>(&mut conn)
            .optional()
            .into_core()?
            .map(XirrCacheEntry::try_from)
            .transpose()
    }

    fn save_entry(&self, entry: &XirrCacheEntry) -> Result<()> {
        let row = XirrCacheDB::from(entry);
        self.writer.exec(move |conn| {
            diesel::replace_into(xirr_cache::table)
                .values(&row)
                .execute(conn)
                .into_core()?;
            Ok(())
        })
    }

    fn invalidate_portfolio(&self, portfolio_id: &str) -> Result<usize> {
        let portfolio_id = portfolio_id.to_string();
        self.writer.exec(move |conn| {
            diesel::delete(xirr_cache::table.filter(xirr_cache::portfolio_id.eq(&portfolio_id)))
                .execute(conn)
                .into_core()
        })
    }
}
