use crate::identity;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_marketplace, AppState};
use am_core::types::User;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/me", get(me))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses((status = 200, body = User))
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match identity::authenticate(&market, &headers) {
        Ok(user) => Json(user).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
