use am_core::error::{
    AuthError, MarketError, MessageError, RequestError, SettingsError, UserError,
};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    pub correlation_id: Option<String>,
}

pub fn map_error(
    err: &MarketError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code, message) = match err {
        MarketError::Auth(auth) => map_auth_error(auth),
        MarketError::Request(request) => map_request_error(request),
        MarketError::User(user) => map_user_error(user),
        MarketError::Message(message) => map_message_error(message),
        MarketError::Settings(settings) => map_settings_error(settings),
        MarketError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message.clone(),
        ),
    };

    (
        status,
        Json(ErrorEnvelope {
            code,
            message,
            correlation_id,
        }),
    )
}

fn map_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        AuthError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            err.to_string(),
        ),
        AuthError::Suspended | AuthError::Forbidden { .. } => {
            (StatusCode::FORBIDDEN, "forbidden", err.to_string())
        }
    }
}

fn map_request_error(err: &RequestError) -> (StatusCode, &'static str, String) {
    match err {
        RequestError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        RequestError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        RequestError::InvalidState { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_state",
            err.to_string(),
        ),
        // Losing the accept race is an expected outcome, distinguishable
        // from a server fault so clients refresh instead of retrying blind.
        RequestError::Unavailable => (StatusCode::CONFLICT, "conflict", err.to_string()),
        RequestError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
        RequestError::Storage { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}

fn map_user_error(err: &UserError) -> (StatusCode, &'static str, String) {
    match err {
        UserError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        UserError::EmailTaken => (StatusCode::CONFLICT, "conflict", err.to_string()),
        UserError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
        UserError::Storage { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}

fn map_message_error(err: &MessageError) -> (StatusCode, &'static str, String) {
    match err {
        MessageError::RequestNotFound | MessageError::NotFound => {
            (StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        MessageError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
        MessageError::Storage { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}

fn map_settings_error(err: &SettingsError) -> (StatusCode, &'static str, String) {
    match err {
        SettingsError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
        SettingsError::NotFound | SettingsError::Storage { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}
