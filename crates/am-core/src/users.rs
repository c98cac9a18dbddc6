use crate::error::UserError;
use crate::types::{Role, User, UserId};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone_number: Option<String>,
}

pub trait UserRepository {
    fn insert(&self, input: NewUser) -> Result<User, UserError>;
    fn get(&self, id: &UserId) -> Result<Option<User>, UserError>;
    fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
    fn list(&self, role: Option<Role>, verified: Option<bool>) -> Result<Vec<User>, UserError>;
    fn set_suspended(&self, id: &UserId, suspended: bool) -> Result<User, UserError>;
    fn set_verified(&self, id: &UserId, verified: bool) -> Result<User, UserError>;
    fn increment_completed(&self, id: &UserId) -> Result<(), UserError>;
    fn delete(&self, id: &UserId) -> Result<(), UserError>;
    fn count(&self, role: Option<Role>) -> Result<u32, UserError>;
    fn count_unverified(&self) -> Result<u32, UserError>;
}
