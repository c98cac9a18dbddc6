use am_core::error::SettingsError;
use am_core::settings::SettingsRepository;
use am_core::types::SystemSettings;
use rusqlite::Connection;

pub struct SettingsRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> SettingsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn db_err(err: rusqlite::Error) -> SettingsError {
    SettingsError::Storage {
        message: err.to_string(),
    }
}

impl<'a> SettingsRepository for SettingsRepo<'a> {
    fn get(&self) -> Result<SystemSettings, SettingsError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT allowed_email_domain, admin_approval_required, commission_percentage, payment_system_enabled, platform_notice FROM system_settings WHERE id = 1",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query([]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Err(SettingsError::NotFound);
        };
        Ok(SystemSettings {
            allowed_email_domain: row.get(0).map_err(db_err)?,
            admin_approval_required: row.get(1).map_err(db_err)?,
            commission_percentage: row.get(2).map_err(db_err)?,
            payment_system_enabled: row.get(3).map_err(db_err)?,
            platform_notice: row.get(4).map_err(db_err)?,
        })
    }

    fn save(&self, settings: &SystemSettings) -> Result<(), SettingsError> {
        let affected = self
            .conn
            .execute(
                "UPDATE system_settings SET allowed_email_domain = ?1, admin_approval_required = ?2, commission_percentage = ?3, payment_system_enabled = ?4, platform_notice = ?5 WHERE id = 1",
                (
                    settings.allowed_email_domain.clone(),
                    settings.admin_approval_required,
                    settings.commission_percentage,
                    settings.payment_system_enabled,
                    settings.platform_notice.clone(),
                ),
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(SettingsError::NotFound);
        }
        Ok(())
    }
}
