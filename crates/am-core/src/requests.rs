use crate::error::RequestError;
use crate::types::{HelpRequest, RequestId, RequestStatus, UserId};
use chrono::{DateTime, Utc};

/// Fields fixed at creation time; everything else starts from the defaults
/// of a fresh open request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub title: String,
    pub subject: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub budget: Option<f64>,
    pub attachments: Vec<String>,
    pub student_id: UserId,
}

pub trait RequestRepository {
    fn insert(&self, input: NewRequest) -> Result<HelpRequest, RequestError>;
    fn get(&self, id: &RequestId) -> Result<Option<HelpRequest>, RequestError>;
    /// The browsable marketplace view: status = open AND no helper assigned.
    /// Both conditions are enforced in the query, not filtered after the
    /// fact, so a record with a stale helper assignment can never leak in.
    fn list_open(&self) -> Result<Vec<HelpRequest>, RequestError>;
    fn list_by_student(&self, student_id: &UserId) -> Result<Vec<HelpRequest>, RequestError>;
    fn list_by_helper(&self, helper_id: &UserId) -> Result<Vec<HelpRequest>, RequestError>;
    fn list_all(&self, status: Option<RequestStatus>) -> Result<Vec<HelpRequest>, RequestError>;
    /// Conditional claim: assigns the helper and moves the request to
    /// in_progress only if it is still open and unassigned. Returns whether
    /// this caller won the slot.
    fn try_assign(&self, id: &RequestId, helper_id: &UserId) -> Result<bool, RequestError>;
    fn set_status(&self, id: &RequestId, status: RequestStatus)
    -> Result<HelpRequest, RequestError>;
    fn set_advance_paid(&self, id: &RequestId) -> Result<HelpRequest, RequestError>;
    /// Unconditional helper overwrite; only the admin override path uses it.
    fn set_helper(&self, id: &RequestId, helper_id: &UserId)
    -> Result<HelpRequest, RequestError>;
    fn delete(&self, id: &RequestId) -> Result<(), RequestError>;
    fn count_by_status(&self, status: RequestStatus) -> Result<u32, RequestError>;
    fn count_advance_paid(&self) -> Result<u32, RequestError>;
    fn completed_budget_sum(&self) -> Result<f64, RequestError>;
}
