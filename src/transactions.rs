//! The route handlers for listing, creating, and deleting transactions.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::{Date, OffsetDateTime};

use crate::{
    AppConfig, AppJson, Error,
    auth::CurrentUser,
    db::{Insert, SelectBy},
    models::{
        Amount, Category, DatabaseID, EntryType, MonthRange, NewTransaction, Transaction,
        TransactionQuery, parse_date,
    },
};

/// The query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactions {
    /// Restrict results to a calendar month in `YYYY-MM` form.
    pub month: Option<String>,
}

/// The request body for creating a transaction.
///
/// Everything except `amount` and `category_id` is taken as a raw string and
/// validated by the handler so that invalid input produces the API's error
/// shape rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    /// 'income' or 'expense'.
    #[serde(default, rename = "type")]
    pub entry_type: String,
    /// The monetary amount. Must be a number greater than zero.
    pub amount: Option<f64>,
    /// The calendar date in `YYYY-MM-DD` form. Defaults to the current UTC
    /// date when absent.
    pub date: Option<String>,
    /// An optional free-text note. Trimmed; an empty note is dropped.
    pub note: Option<String>,
    /// The ID of one of the user's categories.
    pub category_id: Option<DatabaseID>,
}

/// How a transaction is represented in API responses.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    id: DatabaseID,
    #[serde(rename = "type")]
    entry_type: EntryType,
    amount: f64,
    date: Date,
    note: Option<String>,
    category_id: Option<DatabaseID>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id(),
            entry_type: transaction.entry_type(),
            amount: transaction.amount(),
            date: transaction.date(),
            note: transaction.note().map(|note| note.to_string()),
            category_id: transaction.category_id(),
        }
    }
}

/// Handler for listing the acting user's transactions, newest first.
///
/// # Errors
///
/// This function will return an error if the `month` query parameter is
/// present but not a valid `YYYY-MM` string.
pub async fn get_transactions(
    State(state): State<AppConfig>,
    user: CurrentUser,
    Query(params): Query<ListTransactions>,
) -> Result<Json<Vec<TransactionResponse>>, Error> {
    let month: Option<MonthRange> = params.month.as_deref().map(str::parse).transpose()?;

    let connection = state.db_connection().lock().unwrap();

    let transactions = Transaction::select(
        TransactionQuery {
            user_id: user.user_id,
            month,
        },
        &connection,
    )?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

/// Handler for creating a new transaction.
///
/// # Errors
///
/// This function will return an error if:
/// - the type is not 'income' or 'expense',
/// - the amount is missing, not a number, or not greater than zero,
/// - the date is present but not a valid `YYYY-MM-DD` date,
/// - the category ID does not refer to one of the acting user's categories.
pub async fn create_transaction(
    State(state): State<AppConfig>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateTransaction>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let entry_type: EntryType = request.entry_type.parse()?;
    let amount = Amount::new(request.amount.ok_or(Error::InvalidAmount)?)?;

    let date = match request.date.as_deref() {
        Some(text) => parse_date(text)?,
        None => OffsetDateTime::now_utc().date(),
    };

    let note = request
        .note
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty());

    let connection = state.db_connection().lock().unwrap();

    // A category owned by another user is rejected the same way as one that
    // does not exist.
    if let Some(category_id) = request.category_id {
        Category::select((category_id, user.user_id), &connection).map_err(|error| {
            match error {
                Error::NotFound => Error::InvalidCategory,
                error => error,
            }
        })?;
    }

    let transaction = NewTransaction {
        user_id: user.user_id,
        category_id: request.category_id,
        entry_type,
        amount,
        date,
        note,
    }
    .insert(&connection)?;

    Ok((StatusCode::CREATED, Json(json!({ "id": transaction.id() }))))
}

/// Handler for deleting one of the acting user's transactions.
///
/// # Errors
///
/// This function will return [Error::NotFound] if no transaction with the
/// given ID is owned by the acting user.
pub async fn delete_transaction(
    State(state): State<AppConfig>,
    user: CurrentUser,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection().lock().unwrap();

    Transaction::delete(transaction_id, user.user_id, &connection)?;

    Ok(Json(json!({ "message": "ok" })))
}
