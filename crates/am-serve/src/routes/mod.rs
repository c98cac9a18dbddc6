pub mod admin;
pub mod auth;
pub mod error;
pub mod messages;
pub mod requests;
pub mod users;

use crate::middleware::correlation::correlation_middleware;
use crate::{openapi, sse, ws, AppState};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(requests::router(state.clone()))
        .merge(messages::router(state.clone()))
        .merge(admin::router(state.clone()))
        .merge(sse::router(state.clone()))
        .merge(ws::router(state.clone()))
        .merge(openapi::router())
        .route_layer(middleware::from_fn(correlation_middleware));

    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5500"),
            HeaderValue::from_static("http://127.0.0.1:5500"),
            HeaderValue::from_static("http://localhost:3000"),
        ])
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
