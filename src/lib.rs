//! Budget Guard tracks spending against per-category budget limits.
//!
//! Users record income and expense transactions and set a spending limit for
//! any of their categories. Each new expense is checked against its
//! category's limit as part of the same write, and the user is alerted once
//! when their spending in a category reaches its limit.
//!
//! This library provides a JSON REST API, see [build_router].

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod budget_limit;
mod category;
mod config;
mod database_id;
mod db;
mod endpoints;
mod enforcer;
mod limit_cache;
mod routing;
mod transaction;
mod user;
mod validation;

#[cfg(test)]
mod test_utils;

pub use alert::{AlertNotifier, BudgetAlert, LogNotifier, NotificationError, send_alert};
pub use app_state::{AppState, create_cookie_key};
pub use auth::{auth_guard, set_auth_cookie};
pub use budget_limit::BudgetLimit;
pub use category::CategoryName;
pub use config::EnforcerConfig;
pub use db::initialize as initialize_db;
pub use enforcer::{BudgetEnforcer, BudgetStatus, EnforcementOutcome};
pub use limit_cache::LimitCache;
pub use routing::build_router;
pub use transaction::{Transaction, TransactionType};
pub use user::{User, UserID, create_user, get_user_by_id};
pub use validation::{Field, LimitInput, TransactionInput, ValidationError};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
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
    /// The client sent a transaction or limit that failed validation.
    ///
    /// Nothing is persisted when this error is returned.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request did not carry a valid auth cookie, or the cookie refers to
    /// a user that does not exist.
    #[error("you must be logged in to do that")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The email is already registered to another user.
    #[error("the email is already in use")]
    DuplicateEmail,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A task on the blocking thread pool panicked or was cancelled.
    #[error("a database task failed: {0}")]
    BlockingTaskFailed(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::Validation(error) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": error.message, "field": error.field }),
            ),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": Error::Unauthorized.to_string() }),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": Error::NotFound.to_string() }),
            ),
            Error::DuplicateEmail => (
                StatusCode::CONFLICT,
                json!({ "error": Error::DuplicateEmail.to_string() }),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An unexpected error occurred, check the server logs for more details." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
