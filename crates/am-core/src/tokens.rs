use crate::error::MarketError;
use crate::types::{AuthToken, UserId};
use chrono::{DateTime, Utc};

pub trait TokenRepository {
    fn insert(&self, token: AuthToken) -> Result<(), MarketError>;
    /// Looks up an unexpired token by its hash; `now` is passed in so the
    /// expiry check happens in one place.
    fn get_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, MarketError>;
    fn revoke(&self, token_hash: &str) -> Result<(), MarketError>;
    fn revoke_for_user(&self, user_id: &UserId) -> Result<(), MarketError>;
}
