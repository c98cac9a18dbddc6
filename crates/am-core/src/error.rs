use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not validate credentials")]
    Unauthenticated,
    #[error("user account is suspended")]
    Suspended,
    #[error("forbidden: {message}")]
    Forbidden { message: String },
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request not found")]
    NotFound,
    #[error("forbidden: {message}")]
    Forbidden { message: String },
    #[error("invalid state: {message}")]
    InvalidState { message: String },
    /// The open slot was taken between read and write, or the request
    /// vanished. Expected under concurrent load; clients refresh and retry.
    #[error("request no longer available")]
    Unavailable,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("request not found")]
    RequestNotFound,
    #[error("message not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings not initialized")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum MarketError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MarketError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
