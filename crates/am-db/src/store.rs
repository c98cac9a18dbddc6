use am_core::store::Store;
use am_core::MarketError;
use rusqlite::Connection;

use crate::audit_repo::AuditRepo;
use crate::message_repo::MessageRepo;
use crate::request_repo::RequestRepo;
use crate::settings_repo::SettingsRepo;
use crate::token_repo::TokenRepo;
use crate::user_repo::UserRepo;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Store for DbStore {
    type Requests<'a>
        = RequestRepo<'a>
    where
        Self: 'a;
    type Users<'a>
        = UserRepo<'a>
    where
        Self: 'a;
    type Messages<'a>
        = MessageRepo<'a>
    where
        Self: 'a;
    type Audit<'a>
        = AuditRepo<'a>
    where
        Self: 'a;
    type Settings<'a>
        = SettingsRepo<'a>
    where
        Self: 'a;
    type Tokens<'a>
        = TokenRepo<'a>
    where
        Self: 'a;

    fn requests(&self) -> Self::Requests<'_> {
        RequestRepo::new(&self.conn)
    }

    fn users(&self) -> Self::Users<'_> {
        UserRepo::new(&self.conn)
    }

    fn messages(&self) -> Self::Messages<'_> {
        MessageRepo::new(&self.conn)
    }

    fn audit(&self) -> Self::Audit<'_> {
        AuditRepo::new(&self.conn)
    }

    fn settings(&self) -> Self::Settings<'_> {
        SettingsRepo::new(&self.conn)
    }

    fn tokens(&self) -> Self::Tokens<'_> {
        TokenRepo::new(&self.conn)
    }

    fn with_tx<F, T>(&self, f: F) -> Result<T, MarketError>
    where
        F: FnOnce(&Self) -> Result<T, MarketError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|err| MarketError::internal(err.to_string()))?;
        let result = f(self);
        match result {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|err| MarketError::internal(err.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK")
                    .map_err(|rollback_err| MarketError::internal(rollback_err.to_string()))?;
                Err(err)
            }
        }
    }
}
