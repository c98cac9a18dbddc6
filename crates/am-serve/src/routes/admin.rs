use crate::identity;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_marketplace, AppState};
use am_core::error::{RequestError, UserError};
use am_core::types::io::{AdminOverview, RequestFilter, UpdateUserStatusInput, UserFilter};
use am_core::types::{
    ActivityLog, Actor, HelpRequest, Message, MessageId, RequestId, SystemSettings,
    UpdateSettingsInput, User, UserId,
};
use am_core::MarketError;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReassignInput {
    pub helper_id: UserId,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/admin/overview", get(overview))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/status", put(update_user_status))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/requests", get(list_all_requests))
        .route("/admin/requests/{id}", delete(delete_request))
        .route("/admin/requests/{id}/reassign", put(reassign_helper))
        .route("/admin/chats/{id}", get(view_chat_history))
        .route("/admin/messages/{id}", delete(delete_message))
        .route("/admin/settings", get(get_settings).put(update_settings))
        .route("/admin/logs", get(get_logs))
        .with_state(state)
}

/// Resolves the caller; role enforcement lives in the engine so every
/// admin operation fails closed even if a route is wired up wrong.
fn admin_actor(
    market: &am_core::Marketplace<am_db::store::DbStore>,
    headers: &HeaderMap,
) -> Result<Actor, MarketError> {
    identity::authenticate(market, headers).map(|user| Actor::of(&user))
}

macro_rules! market_and_actor {
    ($state:expr, $correlation:expr, $headers:expr) => {{
        let market = match build_marketplace($state) {
            Ok(market) => market,
            Err(err) => return map_error(&err, Some($correlation.0)).into_response(),
        };
        let actor = match admin_actor(&market, $headers) {
            Ok(actor) => actor,
            Err(err) => return map_error(&err, Some($correlation.0)).into_response(),
        };
        (market, actor)
    }};
}

#[utoipa::path(
    get,
    path = "/api/admin/overview",
    responses((status = 200, body = AdminOverview))
)]
pub(crate) async fn overview(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    match market.admin().overview(&actor) {
        Ok(overview) => Json(overview).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserFilter),
    responses((status = 200, body = Vec<User>))
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(filter): Query<UserFilter>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    match market
        .admin()
        .list_users(&actor, filter.role, filter.verified)
    {
        Ok(users) => Json(users).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/status",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserStatusInput,
    responses((status = 200, body = User))
)]
pub(crate) async fn update_user_status(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateUserStatusInput>,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    let user_id = match parse_user_id(&id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.admin().set_user_status(&actor, &user_id, input) {
        Ok(user) => Json(user).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses((status = 200))
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    let user_id = match parse_user_id(&id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.admin().delete_user(&actor, &user_id) {
        Ok(()) => Json(serde_json::json!({ "message": "User deleted" })).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/requests",
    params(RequestFilter),
    responses((status = 200, body = Vec<HelpRequest>))
)]
pub(crate) async fn list_all_requests(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(filter): Query<RequestFilter>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    match market.admin().list_requests(&actor, filter.status) {
        Ok(requests) => Json(requests).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/requests/{id}",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200))
)]
pub(crate) async fn delete_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    let request_id = match parse_request_id(&id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.admin().delete_request(&actor, &request_id) {
        Ok(()) => Json(serde_json::json!({ "message": "Request deleted" })).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/requests/{id}/reassign",
    params(("id" = String, Path, description = "Request ID")),
    request_body = ReassignInput,
    responses((status = 200, body = HelpRequest))
)]
pub(crate) async fn reassign_helper(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ReassignInput>,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    let request_id = match parse_request_id(&id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market
        .admin()
        .reassign_helper(&actor, &request_id, &input.helper_id)
    {
        Ok(request) => Json(request).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/chats/{id}",
    params(("id" = String, Path, description = "Request ID")),
    responses((status = 200, body = Vec<Message>))
)]
pub(crate) async fn view_chat_history(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    let request_id = match parse_request_id(&id) {
        Ok(value) => value,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.admin().chat_history(&actor, &request_id) {
        Ok(messages) => Json(messages).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/messages/{id}",
    params(("id" = String, Path, description = "Message ID")),
    responses((status = 200))
)]
pub(crate) async fn delete_message(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    let message_id = match MessageId::from_str(&id) {
        Ok(value) => value,
        Err(err) => {
            return map_error(
                &MarketError::Message(am_core::error::MessageError::InvalidInput {
                    message: err.to_string(),
                }),
                Some(correlation.0),
            )
            .into_response()
        }
    };
    match market.admin().delete_message(&actor, &message_id) {
        Ok(()) => Json(serde_json::json!({ "message": "Message deleted" })).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, body = SystemSettings))
)]
pub(crate) async fn get_settings(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    match market.admin().get_settings(&actor) {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsInput,
    responses((status = 200, body = SystemSettings))
)]
pub(crate) async fn update_settings(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
    Json(input): Json<UpdateSettingsInput>,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    match market.admin().update_settings(&actor, input) {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/logs",
    responses((status = 200, body = Vec<ActivityLog>))
)]
pub(crate) async fn get_logs(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Response {
    let (market, actor) = market_and_actor!(&state, correlation, &headers);
    match market.admin().logs(&actor) {
        Ok(logs) => Json(logs).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

fn parse_user_id(value: &str) -> Result<UserId, MarketError> {
    UserId::from_str(value).map_err(|err| {
        MarketError::User(UserError::InvalidInput {
            message: err.to_string(),
        })
    })
}

fn parse_request_id(value: &str) -> Result<RequestId, MarketError> {
    RequestId::from_str(value).map_err(|err| {
        MarketError::Request(RequestError::InvalidInput {
            message: err.to_string(),
        })
    })
}
