use crate::identity;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_marketplace, AppState};
use am_core::error::RequestError;
use am_core::types::{Message, RequestId};
use am_core::MarketError;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use std::str::FromStr;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/requests/{id}/messages", get(get_messages))
        .with_state(state)
}

/// Chat history for a request. Sending happens over the socket; this is the
/// durable read path a reconnecting client uses to catch up.
#[utoipa::path(
    get,
    path = "/api/requests/{id}/messages",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = Vec<Message>))
)]
pub(crate) async fn get_messages(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    if let Err(err) = identity::authenticate(&market, &headers) {
        return map_error(&err, Some(correlation.0)).into_response();
    }
    let request_id = match RequestId::from_str(&id) {
        Ok(value) => value,
        Err(err) => {
            return map_error(
                &MarketError::Request(RequestError::InvalidInput {
                    message: err.to_string(),
                }),
                Some(correlation.0),
            )
            .into_response()
        }
    };
    match market.messages().list(&request_id) {
        Ok(messages) => Json(messages).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
