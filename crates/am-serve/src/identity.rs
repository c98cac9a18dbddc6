use am_core::error::AuthError;
use am_core::types::User;
use am_core::{MarketError, Marketplace, Store};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolves the request's bearer credential to a user. Missing or invalid
/// tokens are `Unauthenticated`; a suspended account is rejected outright.
pub fn authenticate<S: Store>(
    market: &Marketplace<S>,
    headers: &HeaderMap,
) -> Result<User, MarketError> {
    let Some(token) = bearer_token(headers) else {
        return Err(AuthError::Unauthenticated.into());
    };
    market.auth().resolve(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn missing_header_yields_none() {
        assert!(bearer_token(&HeaderMap::new()).is_none());
    }
}
