//! `app_settings` key/value storage.

mod model;
mod repository;

pub use model::AppSettingDB;
pub use repository::SettingsRepository;
