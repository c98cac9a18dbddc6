use crate::types::enums::Role;
use crate::types::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub rating: f64,
    pub completed_tasks: u32,
    pub is_suspended: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller of an engine operation. Resolved from a bearer
/// credential before any lifecycle check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn of(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
        }
    }
}
