use crate::util::{from_rfc3339, to_rfc3339};
use am_core::error::MarketError;
use am_core::tokens::TokenRepository;
use am_core::types::{AuthToken, UserId};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::str::FromStr;

pub struct TokenRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> TokenRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn db_err(err: rusqlite::Error) -> MarketError {
    MarketError::internal(err.to_string())
}

impl<'a> TokenRepository for TokenRepo<'a> {
    fn insert(&self, token: AuthToken) -> Result<(), MarketError> {
        self.conn
            .execute(
                "INSERT INTO auth_tokens (token_hash, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
                (
                    token.token_hash.clone(),
                    token.user_id.as_str(),
                    to_rfc3339(&token.expires_at),
                    to_rfc3339(&token.created_at),
                ),
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn get_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, MarketError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT token_hash, user_id, expires_at, created_at FROM auth_tokens WHERE token_hash = ?1",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query([token_hash]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        let hash: String = row.get(0).map_err(db_err)?;
        let user_id: String = row.get(1).map_err(db_err)?;
        let expires_at: String = row.get(2).map_err(db_err)?;
        let created_at: String = row.get(3).map_err(db_err)?;
        let token = AuthToken {
            token_hash: hash,
            user_id: UserId::from_str(&user_id)
                .map_err(|err| MarketError::internal(err.to_string()))?,
            expires_at: from_rfc3339(&expires_at)
                .map_err(|err| MarketError::internal(err.to_string()))?,
            created_at: from_rfc3339(&created_at)
                .map_err(|err| MarketError::internal(err.to_string()))?,
        };
        if token.expires_at <= now {
            return Ok(None);
        }
        Ok(Some(token))
    }

    fn revoke(&self, token_hash: &str) -> Result<(), MarketError> {
        self.conn
            .execute("DELETE FROM auth_tokens WHERE token_hash = ?1", [token_hash])
            .map_err(db_err)?;
        Ok(())
    }

    fn revoke_for_user(&self, user_id: &UserId) -> Result<(), MarketError> {
        self.conn
            .execute(
                "DELETE FROM auth_tokens WHERE user_id = ?1",
                [user_id.as_str()],
            )
            .map_err(db_err)?;
        Ok(())
    }
}
