use crate::error::SettingsError;
use crate::types::SystemSettings;

pub trait SettingsRepository {
    fn get(&self) -> Result<SystemSettings, SettingsError>;
    fn save(&self, settings: &SystemSettings) -> Result<(), SettingsError>;
}
