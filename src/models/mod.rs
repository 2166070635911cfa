//! The domain models for users, categories, and transactions.

mod category;
mod entry_type;
mod password;
mod transaction;
mod user;

pub use category::{Category, CategoryName, NewCategory};
pub use entry_type::EntryType;
pub use password::PasswordHash;
pub use transaction::{
    Amount, MonthRange, NewTransaction, Transaction, TransactionQuery, parse_date,
};
pub use user::{NewUser, User, UserID};

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;
