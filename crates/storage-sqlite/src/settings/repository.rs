use diesel::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::model::AppSettingDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::app_settings::dsl::*;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::settings::{Settings, SettingsRepositoryTrait};

pub struct SettingsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SettingsRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SettingsRepository { pool, writer }
    }
}

impl SettingsRepositoryTrait for SettingsRepository {
    fn get_settings(&self) -> Result<Settings> {
        let mut conn = get_connection(&self.pool)?;
        let all_settings: HashMap<String, String> = app_settings
            .select((setting_key, setting_value))
            .load::<(String, String)>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .collect();

        Settings::from_key_values(&all_settings)
    }

    fn update_setting(&self, setting_key_param: &str, setting_value_param: &str) -> Result<()> {
        // Reject values that would make every later get_settings fail.
        let mut candidate = HashMap::new();
        candidate.insert(setting_key_param.to_string(), setting_value_param.to_string());
        Settings::from_key_values(&candidate)?;

        let row = AppSettingDB::new(setting_key_param, setting_value_param);
        self.writer.exec(move |conn| {
            diesel::replace_into(app_settings)
                .values(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
            Ok(())
        })
    }
}
