use crate::types::ids::{MessageId, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Chat message scoped to one help request. Append-only; there is no edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: MessageId,
    pub request_id: RequestId,
    pub sender_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
