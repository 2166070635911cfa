//! This file defines the `Transaction` type and its supporting types: validated
//! amounts, the month filter used when listing, and the insert/select/delete
//! database operations.

use std::str::FromStr;

use rusqlite::{Connection, Row, named_params};
use time::{
    Date, Month, OffsetDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    Error,
    db::{CreateTable, Insert, MapRow, SelectBy},
    models::{DatabaseID, EntryType, UserID},
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a calendar date in `YYYY-MM-DD` form.
///
/// # Errors
///
/// This function will return [Error::InvalidDate] if `text` is not a valid
/// date in that format.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text, DATE_FORMAT).map_err(|_| Error::InvalidDate)
}

/// A positive monetary amount with two-decimal precision.
///
/// Amounts are rounded to the nearest cent on construction so that values
/// round-trip through the database unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount(f64);

impl Amount {
    /// Validate a raw amount.
    ///
    /// # Errors
    ///
    /// This function will return [Error::InvalidAmount] if `value` is not a
    /// finite number greater than zero.
    pub fn new(value: f64) -> Result<Self, Error> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidAmount);
        }

        Ok(Self((value * 100.0).round() / 100.0))
    }

    /// The amount as a plain number.
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// A calendar month, parsed from a `YYYY-MM` string.
///
/// The month covers the half-open date interval `[start, end)` where `end` is
/// the first day of the following month, so comparisons never need to know how
/// many days the month has.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthRange {
    start: Date,
    end: Date,
}

impl MonthRange {
    /// The first day of the month.
    pub fn start(&self) -> Date {
        self.start
    }

    /// The first day of the following month (exclusive bound).
    pub fn end(&self) -> Date {
        self.end
    }
}

impl FromStr for MonthRange {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (year, month) = text.split_once('-').ok_or(Error::InvalidMonth)?;

        let year: i32 = year.parse().map_err(|_| Error::InvalidMonth)?;
        let month: u8 = month.parse().map_err(|_| Error::InvalidMonth)?;
        let month = Month::try_from(month).map_err(|_| Error::InvalidMonth)?;

        let start =
            Date::from_calendar_date(year, month, 1).map_err(|_| Error::InvalidMonth)?;
        let end = match month {
            Month::December => Date::from_calendar_date(year + 1, Month::January, 1),
            month => Date::from_calendar_date(year, month.next(), 1),
        }
        .map_err(|_| Error::InvalidMonth)?;

        Ok(Self { start, end })
    }
}

/// A single income or expense record owned by a user.
///
/// Transactions are immutable once created; the only lifecycle operation
/// besides creation is deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    id: DatabaseID,
    user_id: UserID,
    category_id: Option<DatabaseID>,
    entry_type: EntryType,
    amount: f64,
    date: Date,
    note: Option<String>,
    created_at: OffsetDateTime,
}

impl Transaction {
    /// The id of the transaction.
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    /// The id of the user that owns the transaction.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// The id of the category the transaction belongs to, if any.
    pub fn category_id(&self) -> Option<DatabaseID> {
        self.category_id
    }

    /// Whether the transaction records income or an expense.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// The monetary amount, always positive with two-decimal precision.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The calendar date the transaction happened on.
    pub fn date(&self) -> Date {
        self.date
    }

    /// The free-text note attached to the transaction, if any.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// When the transaction was recorded.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Delete the transaction with the given `id` owned by `user_id`.
    ///
    /// # Errors
    ///
    /// This function will return [Error::NotFound] if no transaction with
    /// that id is owned by `user_id`. A transaction owned by another user
    /// produces the same error as a missing one so that its existence is not
    /// leaked.
    pub fn delete(
        id: DatabaseID,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<(), Error> {
        let rows_deleted = connection.execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_deleted == 0 {
            Err(Error::NotFound)
        } else {
            Ok(())
        }
    }
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        // Deleting a category is not exposed by the API, so category_id has
        // no ON DELETE action.
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category_id INTEGER,
                entry_type TEXT NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id)
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            user_id: UserID::new(row.get(1)?),
            category_id: row.get(2)?,
            entry_type: row.get(3)?,
            amount: row.get(4)?,
            date: row.get(5)?,
            note: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// The data needed to insert a new transaction into the database.
pub struct NewTransaction {
    /// The user that will own the transaction.
    pub user_id: UserID,
    /// The category the transaction belongs to, if any. Must be owned by
    /// `user_id`; callers are expected to check ownership before inserting.
    pub category_id: Option<DatabaseID>,
    /// Whether the transaction records income or an expense.
    pub entry_type: EntryType,
    /// The validated amount.
    pub amount: Amount,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// An optional free-text note. Must be trimmed and non-empty if present.
    pub note: Option<String>,
}

impl Insert for NewTransaction {
    type ResultType = Transaction;

    /// Create a new transaction in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if `category_id` does not refer to an
    ///   existing category (foreign key backstop),
    /// - [Error::SqlError] if there is some other SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, Error> {
        let created_at = OffsetDateTime::now_utc();

        connection.execute(
            "INSERT INTO \"transaction\" (user_id, category_id, entry_type, amount, date, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                self.user_id.as_i64(),
                self.category_id,
                self.entry_type,
                self.amount.as_f64(),
                self.date,
                &self.note,
                created_at,
            ),
        )?;

        let transaction_id = connection.last_insert_rowid();

        Ok(Transaction {
            id: transaction_id,
            user_id: self.user_id,
            category_id: self.category_id,
            entry_type: self.entry_type,
            amount: self.amount.as_f64(),
            date: self.date,
            note: self.note,
            created_at,
        })
    }
}

/// The parameters for listing a user's transactions.
pub struct TransactionQuery {
    /// The user whose transactions to list.
    pub user_id: UserID,
    /// Restrict results to a single calendar month.
    pub month: Option<MonthRange>,
}

impl SelectBy<TransactionQuery> for Transaction {
    type ResultType = Vec<Self>;

    /// Retrieve the transactions matching `query`, newest first.
    ///
    /// Results are ordered by date descending and then by id descending so
    /// that transactions on the same date have a deterministic order.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn select(query: TransactionQuery, connection: &Connection) -> Result<Self::ResultType, Error> {
        match query.month {
            Some(month) => connection
                .prepare(
                    "SELECT id, user_id, category_id, entry_type, amount, date, note, created_at
                     FROM \"transaction\"
                     WHERE user_id = :user_id AND date >= :start AND date < :end
                     ORDER BY date DESC, id DESC",
                )?
                .query_map(
                    named_params! {
                        ":user_id": query.user_id.as_i64(),
                        ":start": month.start(),
                        ":end": month.end(),
                    },
                    Transaction::map_row,
                )?
                .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
                .collect(),
            None => connection
                .prepare(
                    "SELECT id, user_id, category_id, entry_type, amount, date, note, created_at
                     FROM \"transaction\"
                     WHERE user_id = :user_id
                     ORDER BY date DESC, id DESC",
                )?
                .query_map(
                    named_params! { ":user_id": query.user_id.as_i64() },
                    Transaction::map_row,
                )?
                .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
                .collect(),
        }
    }
}



#[cfg(test)]
mod parse_date_tests {
    use time::macros::date;

    use crate::{Error, models::parse_date};

    #[test]
    fn parses_an_iso_date() {
        assert_eq!(parse_date("2025-12-15"), Ok(date!(2025 - 12 - 15)));
    }

    #[test]
    fn rejects_malformed_dates() {
        for text in ["2025-13-01", "2025-02-30", "15-12-2025", "yesterday", ""] {
            assert_eq!(parse_date(text), Err(Error::InvalidDate), "{text}");
        }
    }
}

#[cfg(test)]
mod transaction_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::{Insert, SelectBy, initialize},
        models::{
            Amount, CategoryName, EntryType, NewCategory, NewTransaction, NewUser, PasswordHash,
            Transaction, TransactionQuery, User, UserID,
        },
    };

    fn create_database_and_insert_test_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let test_user = NewUser {
            email: "foo@bar.baz".to_string(),
            password_hash: PasswordHash::new("averysafeandsecurepassword", 4)
                .unwrap(),
        }
        .insert(&conn)
        .unwrap();

        (conn, test_user)
    }

    fn new_transaction_on(user_id: UserID, date: time::Date) -> NewTransaction {
        NewTransaction {
            user_id,
            category_id: None,
            entry_type: EntryType::Expense,
            amount: Amount::new(42.5).unwrap(),
            date,
            note: None,
        }
    }

    #[test]
    fn insert_transaction_succeeds() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let category = NewCategory {
            user_id: test_user.id(),
            name: CategoryName::new("Food").unwrap(),
            entry_type: EntryType::Expense,
        }
        .insert(&conn)
        .unwrap();

        let transaction = NewTransaction {
            user_id: test_user.id(),
            category_id: Some(category.id()),
            entry_type: EntryType::Expense,
            amount: Amount::new(42.5).unwrap(),
            date: date!(2025 - 12 - 15),
            note: Some("groceries".to_string()),
        }
        .insert(&conn)
        .unwrap();

        assert!(transaction.id() > 0);
        assert_eq!(transaction.user_id(), test_user.id());
        assert_eq!(transaction.category_id(), Some(category.id()));
        assert_eq!(transaction.amount(), 42.5);
        assert_eq!(transaction.date(), date!(2025 - 12 - 15));
        assert_eq!(transaction.note(), Some("groceries"));
    }

    #[test]
    fn insert_transaction_fails_on_non_existent_category() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let result = NewTransaction {
            user_id: test_user.id(),
            category_id: Some(1337),
            entry_type: EntryType::Expense,
            amount: Amount::new(42.5).unwrap(),
            date: date!(2025 - 12 - 15),
            note: None,
        }
        .insert(&conn);

        assert_eq!(result, Err(Error::InvalidCategory));
    }

    #[test]
    fn inserted_transaction_round_trips_through_the_database() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let inserted = new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();

        let selected = Transaction::select(
            TransactionQuery {
                user_id: test_user.id(),
                month: None,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(selected, vec![inserted]);
    }

    #[test]
    fn select_transactions_returns_newest_first() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let older = new_transaction_on(test_user.id(), date!(2025 - 11 - 30))
            .insert(&conn)
            .unwrap();
        let first_on_day = new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();
        let second_on_day = new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();

        let selected = Transaction::select(
            TransactionQuery {
                user_id: test_user.id(),
                month: None,
            },
            &conn,
        )
        .unwrap();

        // Same-date entries tie-break by id, descending.
        assert_eq!(selected, vec![second_on_day, first_on_day, older]);
    }

    #[test]
    fn select_transactions_filters_to_the_half_open_month() {
        let (conn, test_user) = create_database_and_insert_test_user();

        new_transaction_on(test_user.id(), date!(2025 - 11 - 30))
            .insert(&conn)
            .unwrap();
        let first_of_month = new_transaction_on(test_user.id(), date!(2025 - 12 - 01))
            .insert(&conn)
            .unwrap();
        let mid_month = new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();
        new_transaction_on(test_user.id(), date!(2026 - 01 - 01))
            .insert(&conn)
            .unwrap();

        let selected = Transaction::select(
            TransactionQuery {
                user_id: test_user.id(),
                month: Some("2025-12".parse().unwrap()),
            },
            &conn,
        )
        .unwrap();

        assert_eq!(selected, vec![mid_month, first_of_month]);
    }

    #[test]
    fn select_transactions_is_scoped_to_the_user() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let other_user = NewUser {
            email: "bar@baz.qux".to_string(),
            password_hash: PasswordHash::new("anothersecurepassword", 4).unwrap(),
        }
        .insert(&conn)
        .unwrap();

        new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();

        let selected = Transaction::select(
            TransactionQuery {
                user_id: other_user.id(),
                month: None,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(selected, []);
    }

    #[test]
    fn delete_transaction_succeeds_for_the_owner() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let transaction = new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();

        assert!(Transaction::delete(transaction.id(), test_user.id(), &conn).is_ok());

        let remaining = Transaction::select(
            TransactionQuery {
                user_id: test_user.id(),
                month: None,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(remaining, []);
    }

    #[test]
    fn delete_transaction_fails_for_other_users() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let other_user = NewUser {
            email: "bar@baz.qux".to_string(),
            password_hash: PasswordHash::new("anothersecurepassword", 4).unwrap(),
        }
        .insert(&conn)
        .unwrap();

        let transaction = new_transaction_on(test_user.id(), date!(2025 - 12 - 15))
            .insert(&conn)
            .unwrap();

        assert_eq!(
            Transaction::delete(transaction.id(), other_user.id(), &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_transaction_fails_for_missing_id() {
        let (conn, test_user) = create_database_and_insert_test_user();

        assert_eq!(
            Transaction::delete(1337, test_user.id(), &conn),
            Err(Error::NotFound)
        );
    }
}
