use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::model::SecurityDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{not_found, IntoCore};
use crate::schema::securities;
use crate::utils::{chunk_for_sqlite, optional_decimal_text};
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::securities::{NewSecurity, Security, SecurityRepositoryTrait};

pub struct SecurityRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SecurityRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SecurityRepository { pool, writer }
    }
}

fn load_security(conn: &mut SqliteConnection, security_id: &str) -> Result<Security> {
    securities::table
        .find(security_id)
        .select(SecurityDB::as_select())
        .first::<SecurityDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| not_found(format!("security {}", security_id)))?
        .try_into()
}

impl SecurityRepositoryTrait for SecurityRepository {
    fn get_by_id(&self, security_id: &str) -> Result<Security> {
        let mut conn = get_connection(&self.pool)?;
        load_security(&mut conn, security_id)
    }

    fn list(&self) -> Result<Vec<Security>> {
        let mut conn = get_connection(&self.pool)?;
        securities::table
            .select(SecurityDB::as_select())
            .order(securities::symbol.asc())
            .load::<SecurityDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Security::try_from)
            .collect()
    }

    fn list_by_ids(&self, security_ids: &[String]) -> Result<Vec<Security>> {
        let mut conn = get_connection(&self.pool)?;
        let mut rows = Vec::with_capacity(security_ids.len());
        for chunk in chunk_for_sqlite(security_ids) {
            let loaded = securities::table
                .filter(securities::id.eq_any(chunk))
                .select(SecurityDB::as_select())
                .load::<SecurityDB>(&mut conn)
                .into_core()?;
            rows.extend(loaded);
        }
        rows.into_iter().map(Security::try_from).collect()
    }

    fn create(&self, new_security: NewSecurity) -> Result<Security> {
        new_security.validate()?;
        let now = Utc::now().naive_utc();
        let symbol = new_security.symbol.trim().to_string();
        let row = SecurityDB {
            id: new_security.id.unwrap_or_else(|| symbol.clone()),
            symbol,
            name: new_security.name,
            currency: new_security.currency,
            kind: new_security.kind.as_db_str().to_string(),
            current_price: optional_decimal_text(new_security.current_price),
            price_updated_at: new_security.current_price.map(|_| now),
            created_at: now,
            updated_at: now,
        };

        self.writer.exec(move |conn| {
            diesel::insert_into(securities::table)
                .values(&row)
                .execute(conn)
                .into_core()?;
            Security::try_from(row)
        })
    }

    fn update_current_price(
        &self,
        security_id: &str,
        price: Decimal,
        as_of: NaiveDateTime,
    ) -> Result<Security> {
        let id = security_id.to_string();
        self.writer.exec(move |conn| {
            let updated = diesel::update(securities::table.find(&id))
                .set((
                    securities::current_price.eq(Some(price.to_string())),
                    securities::price_updated_at.eq(Some(as_of)),
                    securities::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .into_core()?;
            if updated == 0 {
                return Err(not_found(format!("security {}", id)));
            }
            load_security(conn, &id)
        })
    }
}
