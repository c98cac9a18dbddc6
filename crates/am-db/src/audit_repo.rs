use crate::util::{from_rfc3339, to_rfc3339};
use am_core::audit::AuditRepository;
use am_core::error::MarketError;
use am_core::types::{ActivityLog, LogId, UserId};
use rusqlite::Connection;
use std::str::FromStr;

pub struct AuditRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> AuditRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn db_err(err: rusqlite::Error) -> MarketError {
    MarketError::internal(err.to_string())
}

impl<'a> AuditRepository for AuditRepo<'a> {
    fn append(
        &self,
        user_id: &UserId,
        action: &str,
        details: Option<String>,
    ) -> Result<ActivityLog, MarketError> {
        let log = ActivityLog {
            id: LogId::generate(),
            user_id: user_id.clone(),
            action: action.to_string(),
            details,
            timestamp: chrono::Utc::now(),
        };
        self.conn
            .execute(
                "INSERT INTO activity_logs (id, user_id, action, details, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    log.id.as_str(),
                    log.user_id.as_str(),
                    log.action.clone(),
                    log.details.clone(),
                    to_rfc3339(&log.timestamp),
                ),
            )
            .map_err(db_err)?;
        Ok(log)
    }

    fn recent(&self, limit: u32) -> Result<Vec<ActivityLog>, MarketError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, action, details, timestamp FROM activity_logs ORDER BY timestamp DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query([limit]).map_err(db_err)?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            logs.push(map_log_row(row)?);
        }
        Ok(logs)
    }
}

fn map_log_row(row: &rusqlite::Row<'_>) -> Result<ActivityLog, MarketError> {
    let id: String = row.get(0).map_err(db_err)?;
    let user_id: String = row.get(1).map_err(db_err)?;
    let action: String = row.get(2).map_err(db_err)?;
    let details: Option<String> = row.get(3).map_err(db_err)?;
    let timestamp: String = row.get(4).map_err(db_err)?;

    Ok(ActivityLog {
        id: LogId::from_str(&id).map_err(|err| MarketError::internal(err.to_string()))?,
        user_id: UserId::from_str(&user_id)
            .map_err(|err| MarketError::internal(err.to_string()))?,
        action,
        details,
        timestamp: from_rfc3339(&timestamp)
            .map_err(|err| MarketError::internal(err.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;

    #[test]
    fn recent_returns_newest_first_up_to_limit() {
        let conn = with_test_db().unwrap();
        let repo = AuditRepo::new(&conn);
        let admin = UserId::generate();
        for i in 0..5 {
            repo.append(&admin, "suspend_user", Some(format!("User ID: {i}")))
                .unwrap();
        }
        let logs = repo.recent(3).unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs[0].timestamp >= logs[1].timestamp);
        assert!(logs[1].timestamp >= logs[2].timestamp);
    }
}
