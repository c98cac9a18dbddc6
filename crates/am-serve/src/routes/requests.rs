use crate::identity;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_marketplace, AppState};
use am_core::error::RequestError;
use am_core::types::io::CreateRequestInput;
use am_core::types::request::{HelpRequest, RequestView};
use am_core::types::{Actor, RequestId};
use am_core::MarketError;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use std::str::FromStr;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/requests", post(create_request).get(list_open))
        .route("/requests/my", get(list_my_requests))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/accept", put(accept_request))
        .route("/requests/{id}/pay-advance", put(pay_advance))
        .route("/requests/{id}/complete", put(complete_request))
        .route("/requests/{id}/cancel", put(cancel_request))
        .with_state(state)
}

fn parse_id(value: &str) -> Result<RequestId, MarketError> {
    RequestId::from_str(value).map_err(|err| {
        MarketError::Request(RequestError::InvalidInput {
            message: err.to_string(),
        })
    })
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequestInput,
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn create_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
    Json(input): Json<CreateRequestInput>,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let user = match identity::authenticate(&market, &headers) {
        Ok(user) => user,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.requests().create(&Actor::of(&user), input) {
        Ok(request) => Json(request).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

/// The browsable open list is intentionally public; it never carries
/// contact details.
#[utoipa::path(
    get,
    path = "/api/requests",
    responses((status = 200, body = Vec<HelpRequest>))
)]
pub(crate) async fn list_open(State(state): State<AppState>) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, None).into_response(),
    };
    match market.requests().list_open() {
        Ok(requests) => Json(requests).into_response(),
        Err(err) => map_error(&err, None).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/requests/my",
    responses((status = 200, body = Vec<RequestView>))
)]
pub(crate) async fn list_my_requests(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let user = match identity::authenticate(&market, &headers) {
        Ok(user) => user,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.requests().list_mine(&Actor::of(&user)) {
        Ok(views) => Json(views).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = RequestView))
)]
pub(crate) async fn get_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let user = match identity::authenticate(&market, &headers) {
        Ok(user) => user,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let request_id = match parse_id(&id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.requests().get_view(&Actor::of(&user), &request_id) {
        Ok(view) => Json(view).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/accept",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn accept_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    lifecycle_op(&state, correlation, &id, &headers, |market, actor, id| {
        market.requests().accept(actor, id)
    })
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/pay-advance",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn pay_advance(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    lifecycle_op(&state, correlation, &id, &headers, |market, actor, id| {
        market.requests().pay_advance(actor, id)
    })
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/complete",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn complete_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    lifecycle_op(&state, correlation, &id, &headers, |market, actor, id| {
        market.requests().complete(actor, id)
    })
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/cancel",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn cancel_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    lifecycle_op(&state, correlation, &id, &headers, |market, actor, id| {
        market.requests().cancel(actor, id)
    })
}

/// Shared shell for the four status transitions: build engine, resolve the
/// actor, parse the id, run the operation.
fn lifecycle_op<F>(
    state: &AppState,
    correlation: CorrelationId,
    id: &str,
    headers: &HeaderMap,
    op: F,
) -> Response
where
    F: FnOnce(
        &am_core::Marketplace<am_db::store::DbStore>,
        &Actor,
        &RequestId,
    ) -> Result<HelpRequest, MarketError>,
{
    let market = match build_marketplace(state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let user = match identity::authenticate(&market, headers) {
        Ok(user) => user,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let request_id = match parse_id(id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match op(&market, &Actor::of(&user), &request_id) {
        Ok(request) => Json(request).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
