use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Event fanned out to every subscriber of the global marketplace feed.
///
/// Delivery is best-effort: nothing is persisted or replayed, so a client
/// that reconnects must re-fetch the open-request snapshot instead of
/// relying on events it may have missed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    RequestAccepted { request_id: String },
}
