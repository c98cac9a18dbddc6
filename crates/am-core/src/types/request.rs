use crate::types::enums::RequestStatus;
use crate::types::ids::{RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A help request as persisted. Derived per-viewer fields live on
/// [`RequestView`], never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HelpRequest {
    pub id: RequestId,
    pub title: String,
    pub subject: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub budget: Option<f64>,
    pub attachments: Vec<String>,
    pub status: RequestStatus,
    pub advance_paid: bool,
    pub student_id: UserId,
    pub helper_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-viewer projection of a request: the persisted record plus the
/// counterparty names and the conditionally disclosed phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: HelpRequest,
    pub student_name: Option<String>,
    pub helper_name: Option<String>,
    pub peer_phone: Option<String>,
}
