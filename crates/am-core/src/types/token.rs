use crate::types::ids::UserId;
use chrono::{DateTime, Utc};

/// Issued-credential record. Only the sha256 of the opaque bearer token is
/// kept; the raw token is handed to the client once at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token_hash: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
