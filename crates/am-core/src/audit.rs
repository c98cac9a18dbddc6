use crate::error::MarketError;
use crate::types::{ActivityLog, UserId};

pub trait AuditRepository {
    fn append(
        &self,
        user_id: &UserId,
        action: &str,
        details: Option<String>,
    ) -> Result<ActivityLog, MarketError>;
    /// Most recent entries first.
    fn recent(&self, limit: u32) -> Result<Vec<ActivityLog>, MarketError>;
}
