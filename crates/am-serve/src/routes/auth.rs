use crate::identity;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_marketplace, AppState};
use am_core::types::io::{LoginInput, RegisterInput, TokenOut};
use am_core::types::User;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterInput,
    responses((status = 200, body = User))
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(input): Json<RegisterInput>,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.auth().register(input) {
        Ok(user) => Json(user).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginInput,
    responses((status = 200, body = TokenOut))
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(input): Json<LoginInput>,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match market.auth().login(input) {
        Ok((_user, token)) => Json(TokenOut {
            access_token: token,
            token_type: "bearer",
        })
        .into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200))
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Response {
    let market = match build_marketplace(&state) {
        Ok(market) => market,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let Some(token) = identity::bearer_token(&headers) else {
        return map_error(
            &am_core::error::AuthError::Unauthenticated.into(),
            Some(correlation.0),
        )
        .into_response();
    };
    match market.auth().logout(token) {
        Ok(()) => Json(serde_json::json!({ "message": "Successfully logged out" })).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
