use crate::types::ids::{LogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Audit trail entry for an admin-initiated mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivityLog {
    pub id: LogId,
    pub user_id: UserId,
    pub action: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}
