use diesel::prelude::*;

/// One `app_settings` row. Values stay raw text; `Settings::from_key_values`
/// types them.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::app_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AppSettingDB {
    pub setting_key: String,
    pub setting_value: String,
}

impl AppSettingDB {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            setting_key: key.to_string(),
            setting_value: value.to_string(),
        }
    }
}
