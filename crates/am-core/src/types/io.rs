use crate::types::enums::{RequestStatus, Role};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRequestInput {
    pub title: String,
    pub subject: String,
    pub description: String,
    /// Free-form timestamp; anything unparseable falls back to "now".
    pub deadline: Option<String>,
    pub budget: Option<f64>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
}

/// One optional slot per flag an admin may flip on a user.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserStatusInput {
    pub is_suspended: Option<bool>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminOverview {
    pub total_users: u32,
    pub total_helpers: u32,
    pub total_students: u32,
    pub pending_verifications: u32,
    pub active_requests: u32,
    pub completed_requests: u32,
    pub total_transactions: u32,
    pub revenue_summary: f64,
}
