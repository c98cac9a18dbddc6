use crate::audit::AuditRepository;
use crate::messages::MessageRepository;
use crate::requests::RequestRepository;
use crate::settings::SettingsRepository;
use crate::tokens::TokenRepository;
use crate::users::UserRepository;
use crate::MarketError;

pub trait Store {
    type Requests<'a>: RequestRepository
    where
        Self: 'a;
    type Users<'a>: UserRepository
    where
        Self: 'a;
    type Messages<'a>: MessageRepository
    where
        Self: 'a;
    type Audit<'a>: AuditRepository
    where
        Self: 'a;
    type Settings<'a>: SettingsRepository
    where
        Self: 'a;
    type Tokens<'a>: TokenRepository
    where
        Self: 'a;

    fn requests(&self) -> Self::Requests<'_>;
    fn users(&self) -> Self::Users<'_>;
    fn messages(&self) -> Self::Messages<'_>;
    fn audit(&self) -> Self::Audit<'_>;
    fn settings(&self) -> Self::Settings<'_>;
    fn tokens(&self) -> Self::Tokens<'_>;

    /// Runs `f` inside one transaction: every write either all lands or none
    /// does. Lifecycle operations rely on this for check-then-write safety.
    fn with_tx<F, T>(&self, f: F) -> Result<T, MarketError>
    where
        F: FnOnce(&Self) -> Result<T, MarketError>;
}
