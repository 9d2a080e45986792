//! Repository traits for settings.

use crate::errors::Result;
use crate::settings::Settings;

/// Repository trait for reading and updating application settings.
pub trait SettingsRepositoryTrait: Send + Sync {
    /// Get all settings, falling back to defaults for unset keys.
    fn get_settings(&self) -> Result<Settings>;

    /// Update a single setting.
    fn update_setting(&self, setting_key: &str, setting_value: &str) -> Result<()>;
}
