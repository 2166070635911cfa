//! This file defines the `Category` type and the types needed to create a category.
//! A category labels transactions, e.g., 'Groceries', 'Eating Out', 'Wages'.

use std::fmt::Display;

use rusqlite::{Connection, Row, named_params};

use crate::{
    Error,
    db::{CreateTable, Insert, MapRow, SelectBy},
    models::{DatabaseID, EntryType, UserID},
};

/// The name of a category.
///
/// Guaranteed to be trimmed and non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name from client input.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an error if `name` is empty or whitespace only.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is trimmed and not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the
    /// invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category for expenses or income, owned by a single user.
///
/// A user may reuse a name across entry types ('Other' income and 'Other'
/// expense), but the (user, name, type) triple is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    id: DatabaseID,
    user_id: UserID,
    name: CategoryName,
    entry_type: EntryType,
}

impl Category {
    /// The id of the category.
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    /// The id of the user that owns the category.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// The name of the category.
    pub fn name(&self) -> &CategoryName {
        &self.name
    }

    /// Whether the category is for income or expenses.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }
}

impl CreateTable for Category {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                entry_type TEXT NOT NULL,
                UNIQUE(user_id, name, entry_type),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Category {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let raw_name: String = row.get(2)?;

        Ok(Self {
            id: row.get(0)?,
            user_id: UserID::new(row.get(1)?),
            name: CategoryName::new_unchecked(&raw_name),
            entry_type: row.get(3)?,
        })
    }
}

/// The data needed to insert a new category into the database.
pub struct NewCategory {
    /// The user that will own the category.
    pub user_id: UserID,
    /// The display name of the category.
    pub name: CategoryName,
    /// Whether the category is for income or expenses.
    pub entry_type: EntryType,
}

impl Insert for NewCategory {
    type ResultType = Category;

    /// Create a new category in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateCategory] if the user already owns a category with
    ///   the same name and entry type,
    /// - [Error::SqlError] if there is some other SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, Error> {
        connection.execute(
            "INSERT INTO category (user_id, name, entry_type) VALUES (?1, ?2, ?3)",
            (self.user_id.as_i64(), self.name.as_ref(), self.entry_type),
        )?;

        let category_id = connection.last_insert_rowid();

        Ok(Category {
            id: category_id,
            user_id: self.user_id,
            name: self.name,
            entry_type: self.entry_type,
        })
    }
}

impl SelectBy<UserID> for Category {
    type ResultType = Vec<Self>;

    /// Retrieve the categories owned by `user_id`, ordered by entry type and
    /// then by name so that clients can group them for display.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn select(user_id: UserID, connection: &Connection) -> Result<Self::ResultType, Error> {
        connection
            .prepare(
                "SELECT id, user_id, name, entry_type FROM category
                 WHERE user_id = :user_id
                 ORDER BY entry_type, name",
            )?
            .query_map(
                named_params! { ":user_id": user_id.as_i64() },
                Category::map_row,
            )?
            .map(|maybe_category| maybe_category.map_err(Error::SqlError))
            .collect()
    }
}

impl SelectBy<(DatabaseID, UserID)> for Category {
    type ResultType = Self;

    /// Retrieve the category with the given `id` owned by `user_id`.
    ///
    /// A category owned by another user yields [Error::NotFound], the same as
    /// a category that does not exist.
    fn select(
        (id, user_id): (DatabaseID, UserID),
        connection: &Connection,
    ) -> Result<Self::ResultType, Error> {
        connection
            .prepare(
                "SELECT id, user_id, name, entry_type FROM category
                 WHERE id = :id AND user_id = :user_id",
            )?
            .query_row(
                named_params! { ":id": id, ":user_id": user_id.as_i64() },
                Category::map_row,
            )
            .map_err(|e| e.into())
    }
}
