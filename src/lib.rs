//! Fintrack is a personal finance tracker backend.
//!
//! This library provides a JSON REST API for registering users, managing
//! income/expense categories, and recording transactions with monthly
//! filtering. Every record is scoped to the user that owns it.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod auth;
mod categories;
mod config;
mod db;
mod endpoints;
mod models;
mod routing;
mod transactions;

pub use config::AppConfig;
pub use db::initialize as initialize_db;
pub use routing::{build_router, cors_layer};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client did not provide both an email and a password.
    #[error("email and password are required")]
    MissingCredentials,

    /// The email/password combination did not match a registered user.
    ///
    /// The same error is used for an unknown email and a wrong password so
    /// that clients cannot probe which email addresses are registered.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The bearer token was missing, malformed, or failed verification.
    #[error("invalid or missing bearer token")]
    InvalidToken,

    /// A token could not be created for a valid user.
    ///
    /// The cause should only be logged on the server, the client just sees
    /// a generic internal error.
    #[error("could not create an access token")]
    TokenCreation,

    /// The email used to register is already taken.
    #[error("email is already registered")]
    DuplicateEmail,

    /// The user already owns a category with the same name and type.
    #[error("a category with this name and type already exists")]
    DuplicateCategory,

    /// An empty string was used as a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// A category or transaction type was not 'income' or 'expense'.
    #[error("type must be either 'income' or 'expense'")]
    InvalidEntryType,

    /// A transaction amount was missing, not a number, or not positive.
    #[error("amount must be a number greater than zero")]
    InvalidAmount,

    /// A transaction date could not be parsed.
    #[error("date must be a valid date in YYYY-MM-DD format")]
    InvalidDate,

    /// A month filter could not be parsed.
    #[error("month must be in YYYY-MM format")]
    InvalidMonth,

    /// The category ID used to create a transaction did not match one of
    /// the requesting user's categories.
    #[error("category_id does not refer to one of your categories")]
    InvalidCategory,

    /// The request body was not valid JSON for the expected shape.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The requested resource was not found, or is owned by another user.
    ///
    /// Resources owned by other users deliberately produce the same error
    /// as missing ones so that their existence is not leaked.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 2067 =>
            {
                Error::DuplicateCategory
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
                Error::InvalidCategory
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::MissingCredentials
            | Error::EmptyCategoryName
            | Error::InvalidEntryType
            | Error::InvalidAmount
            | Error::InvalidDate
            | Error::InvalidMonth
            | Error::InvalidCategory
            | Error::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateEmail | Error::DuplicateCategory => StatusCode::CONFLICT,
            Error::TokenCreation | Error::HashingError(_) | Error::SqlError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal errors are not intended to be shown to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// A JSON body extractor whose rejection shares the error shape of the rest
/// of the API.
///
/// Axum's stock `Json` extractor rejects malformed bodies with a plain-text
/// response; routing the rejection through [Error] keeps every failure as a
/// `{"error": ...}` body with status 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub(crate) struct AppJson<T>(pub T);
