use crate::routes::admin::ReassignInput;
use am_core::types::audit::ActivityLog;
use am_core::types::enums::{RequestStatus, Role};
use am_core::types::ids::{LogId, MessageId, RequestId, UserId};
use am_core::types::io::{
    AdminOverview, CreateRequestInput, LoginInput, RegisterInput, RequestFilter, TokenOut,
    UpdateUserStatusInput, UserFilter,
};
use am_core::types::message::Message;
use am_core::types::request::{HelpRequest, RequestView};
use am_core::types::settings::{SystemSettings, UpdateSettingsInput};
use am_core::types::user::User;
use am_events::types::FeedEvent;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::users::me,
        crate::routes::requests::create_request,
        crate::routes::requests::list_open,
        crate::routes::requests::list_my_requests,
        crate::routes::requests::get_request,
        crate::routes::requests::accept_request,
        crate::routes::requests::pay_advance,
        crate::routes::requests::complete_request,
        crate::routes::requests::cancel_request,
        crate::routes::messages::get_messages,
        crate::routes::admin::overview,
        crate::routes::admin::list_users,
        crate::routes::admin::update_user_status,
        crate::routes::admin::delete_user,
        crate::routes::admin::list_all_requests,
        crate::routes::admin::delete_request,
        crate::routes::admin::reassign_helper,
        crate::routes::admin::view_chat_history,
        crate::routes::admin::delete_message,
        crate::routes::admin::get_settings,
        crate::routes::admin::update_settings,
        crate::routes::admin::get_logs,
        crate::sse::feed
    ),
    components(schemas(
        User,
        HelpRequest,
        RequestView,
        Message,
        ActivityLog,
        SystemSettings,
        UpdateSettingsInput,
        CreateRequestInput,
        RegisterInput,
        LoginInput,
        TokenOut,
        UserFilter,
        RequestFilter,
        UpdateUserStatusInput,
        AdminOverview,
        ReassignInput,
        FeedEvent,
        UserId,
        RequestId,
        MessageId,
        LogId,
        Role,
        RequestStatus
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn router() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs_page))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn docs_page() -> impl IntoResponse {
    let html = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>AcadMate API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
      window.ui = SwaggerUIBundle({ url: '/api/openapi.json', dom_id: '#swagger-ui' });
    </script>
  </body>
</html>
"#;
    axum::response::Html(html)
}
