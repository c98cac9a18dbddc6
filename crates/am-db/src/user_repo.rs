use crate::util::{decode_enum, encode_enum, from_rfc3339, to_rfc3339};
use am_core::error::UserError;
use am_core::types::{Role, User, UserId};
use am_core::users::{NewUser, UserRepository};
use rusqlite::Connection;
use std::str::FromStr;

const COLUMNS: &str = "id, name, email, password_hash, role, phone_number, rating, completed_tasks, is_suspended, is_verified, created_at";

pub struct UserRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> UserRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn set_flag(&self, id: &UserId, column: &str, value: bool) -> Result<User, UserError> {
        // Column names come from the two fixed call sites below.
        let sql = format!("UPDATE users SET {column} = ?1 WHERE id = ?2");
        let affected = self
            .conn
            .execute(&sql, (value, id.as_str()))
            .map_err(db_err)?;
        if affected == 0 {
            return Err(UserError::NotFound);
        }
        self.get(id)?.ok_or(UserError::NotFound)
    }
}

fn db_err(err: rusqlite::Error) -> UserError {
    UserError::Storage {
        message: err.to_string(),
    }
}

impl<'a> UserRepository for UserRepo<'a> {
    fn insert(&self, input: NewUser) -> Result<User, UserError> {
        let user = User {
            id: UserId::generate(),
            name: input.name,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            phone_number: input.phone_number,
            rating: 0.0,
            completed_tasks: 0,
            is_suspended: false,
            is_verified: false,
            created_at: chrono::Utc::now(),
        };
        let sql = format!("INSERT INTO users ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)");
        let params = (
            user.id.as_str(),
            user.name.clone(),
            user.email.clone(),
            user.password_hash.clone(),
            encode_enum(&user.role).map_err(|err| UserError::InvalidInput {
                message: err.to_string(),
            })?,
            user.phone_number.clone(),
            user.rating,
            user.completed_tasks,
            user.is_suspended,
            user.is_verified,
            to_rfc3339(&user.created_at),
        );
        self.conn.execute(&sql, params).map_err(|err| match err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                UserError::EmailTaken
            }
            other => db_err(other),
        })?;
        Ok(user)
    }

    fn get(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([id.as_str()]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_user_row(row).map(Some)
    }

    fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([email]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_user_row(row).map(Some)
    }

    fn list(&self, role: Option<Role>, verified: Option<bool>) -> Result<Vec<User>, UserError> {
        let sql = format!("SELECT {COLUMNS} FROM users ORDER BY created_at DESC");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([]).map_err(db_err)?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            users.push(map_user_row(row)?);
        }
        Ok(users
            .into_iter()
            .filter(|user| role.is_none_or(|wanted| user.role == wanted))
            .filter(|user| verified.is_none_or(|wanted| user.is_verified == wanted))
            .collect())
    }

    fn set_suspended(&self, id: &UserId, suspended: bool) -> Result<User, UserError> {
        self.set_flag(id, "is_suspended", suspended)
    }

    fn set_verified(&self, id: &UserId, verified: bool) -> Result<User, UserError> {
        self.set_flag(id, "is_verified", verified)
    }

    fn increment_completed(&self, id: &UserId) -> Result<(), UserError> {
        let affected = self
            .conn
            .execute(
                "UPDATE users SET completed_tasks = completed_tasks + 1 WHERE id = ?1",
                [id.as_str()],
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, id: &UserId) -> Result<(), UserError> {
        let affected = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", [id.as_str()])
            .map_err(db_err)?;
        if affected == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    fn count(&self, role: Option<Role>) -> Result<u32, UserError> {
        match role {
            Some(role) => {
                let encoded = encode_enum(&role).map_err(|err| UserError::InvalidInput {
                    message: err.to_string(),
                })?;
                self.conn
                    .query_row(
                        "SELECT COUNT(*) FROM users WHERE role = ?1",
                        [encoded],
                        |row| row.get(0),
                    )
                    .map_err(db_err)
            }
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(db_err),
        }
    }

    fn count_unverified(&self) -> Result<u32, UserError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE is_verified = 0",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> Result<User, UserError> {
    let invalid = |message: String| UserError::Storage { message };

    let id: String = row.get(0).map_err(db_err)?;
    let name: String = row.get(1).map_err(db_err)?;
    let email: String = row.get(2).map_err(db_err)?;
    let password_hash: String = row.get(3).map_err(db_err)?;
    let role: String = row.get(4).map_err(db_err)?;
    let phone_number: Option<String> = row.get(5).map_err(db_err)?;
    let rating: f64 = row.get(6).map_err(db_err)?;
    let completed_tasks: u32 = row.get(7).map_err(db_err)?;
    let is_suspended: bool = row.get(8).map_err(db_err)?;
    let is_verified: bool = row.get(9).map_err(db_err)?;
    let created_at: String = row.get(10).map_err(db_err)?;

    Ok(User {
        id: UserId::from_str(&id).map_err(|err| invalid(err.to_string()))?,
        name,
        email,
        password_hash,
        role: decode_enum(&role).map_err(|err| invalid(err.to_string()))?,
        phone_number,
        rating,
        completed_tasks,
        is_suspended,
        is_verified,
        created_at: from_rfc3339(&created_at).map_err(|err| invalid(err.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "someone".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role,
            phone_number: Some("9876543210".to_string()),
        }
    }

    #[test]
    fn duplicate_email_maps_to_email_taken() {
        let conn = with_test_db().unwrap();
        let repo = UserRepo::new(&conn);
        repo.insert(new_user("dup@cvru.ac.in", Role::Student)).unwrap();
        let err = repo
            .insert(new_user("dup@cvru.ac.in", Role::Helper))
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[test]
    fn increment_completed_bumps_counter() {
        let conn = with_test_db().unwrap();
        let repo = UserRepo::new(&conn);
        let user = repo.insert(new_user("h@cvru.ac.in", Role::Helper)).unwrap();
        repo.increment_completed(&user.id).unwrap();
        repo.increment_completed(&user.id).unwrap();
        assert_eq!(repo.get(&user.id).unwrap().unwrap().completed_tasks, 2);
    }

    #[test]
    fn list_filters_by_role_and_verified() {
        let conn = with_test_db().unwrap();
        let repo = UserRepo::new(&conn);
        let helper = repo.insert(new_user("h@cvru.ac.in", Role::Helper)).unwrap();
        repo.insert(new_user("s@cvru.ac.in", Role::Student)).unwrap();
        repo.set_verified(&helper.id, true).unwrap();

        let helpers = repo.list(Some(Role::Helper), None).unwrap();
        assert_eq!(helpers.len(), 1);
        let verified = repo.list(None, Some(true)).unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, helper.id);
    }
}
