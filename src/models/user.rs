//! This file defines a user of the application and its supporting types.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    db::{CreateTable, Insert, MapRow, SelectBy},
    models::PasswordHash,
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better
/// compile time errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Wrap a raw database ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The underlying database ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// Users own categories and transactions; deleting a user row cascades to
/// both at the database level.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserID,
    email: String,
    password_hash: PasswordHash,
    created_at: OffsetDateTime,
}

impl User {
    /// The user's ID in the database.
    pub fn id(&self) -> UserID {
        self.id
    }

    /// The normalized (trimmed, lowercased) email address of the user.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The user's password hash.
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// When the user registered.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl CreateTable for User {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                    id INTEGER PRIMARY KEY,
                    email TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    created_at TEXT NOT NULL
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for User {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error> {
        let raw_password_hash: String = row.get(2)?;

        Ok(Self {
            id: UserID::new(row.get(0)?),
            email: row.get(1)?,
            password_hash: PasswordHash::new_unchecked(&raw_password_hash),
            created_at: row.get(3)?,
        })
    }
}

/// The data needed to insert a new user into the database.
///
/// `email` must already be normalized (trimmed and lowercased).
pub struct NewUser {
    /// The normalized email address the user registered with.
    pub email: String,
    /// The hash of the user's password.
    pub password_hash: PasswordHash,
}

impl Insert for NewUser {
    type ResultType = User;

    /// Insert the user into the application database and return the stored user.
    ///
    /// # Errors
    ///
    /// This function will return a:
    /// - [Error::DuplicateEmail] if the given email address is already in use,
    /// - [Error::SqlError] if there was an unexpected SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, Error> {
        let created_at = OffsetDateTime::now_utc();

        connection.execute(
            "INSERT INTO user (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
            (&self.email, self.password_hash.to_string(), created_at),
        )?;

        let id = UserID::new(connection.last_insert_rowid());

        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            created_at,
        })
    }
}

impl SelectBy<&str> for User {
    type ResultType = Self;

    /// Get the user from the database that has the given (normalized) email
    /// address, or return [Error::NotFound] if no such user exists.
    fn select(email: &str, connection: &Connection) -> Result<Self::ResultType, Error> {
        connection
            .prepare("SELECT id, email, password_hash, created_at FROM user WHERE email = :email")?
            .query_row(&[(":email", email)], User::map_row)
            .map_err(|e| e.into())
    }
}
