//! Database operations for budget limits.

use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Error, category::CategoryName, db::get_decimal, user::UserID};

/// The maximum intended spend for a user's category.
///
/// There is at most one limit per user and category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLimit {
    /// The user that set the limit.
    pub user_id: UserID,
    /// The normalized category the limit applies to.
    pub category: CategoryName,
    /// The limit, always positive.
    #[serde(with = "rust_decimal::serde::float")]
    pub limit: Decimal,
}

/// Create the limit for `user_id` and `category`, or replace the existing one.
///
/// Replacing a limit re-arms its alert, so the next write that finds spending
/// at or over the new limit alerts again.
///
/// # Errors
/// This function will return a:
/// - [Error::Unauthorized] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn upsert_budget_limit(
    user_id: UserID,
    category: &CategoryName,
    limit: Decimal,
    connection: &Connection,
) -> Result<BudgetLimit, Error> {
    connection
        .prepare(
            "INSERT INTO budget_limit (user_id, category, amount, breach_notified)
             VALUES (?1, ?2, ?3, 0)
             ON CONFLICT(user_id, category)
             DO UPDATE SET amount = excluded.amount, breach_notified = 0
             RETURNING user_id, category, amount",
        )?
        .query_row(
            (user_id.as_i64(), category.as_ref(), limit.to_string()),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => {
                tracing::warn!("tried to set a budget limit for unknown user {user_id}");
                Error::Unauthorized
            }
            error => error.into(),
        })
}

/// Retrieve the limit for `user_id` and `category`, if one has been set.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_budget_limit(
    user_id: UserID,
    category: &CategoryName,
    connection: &Connection,
) -> Result<Option<BudgetLimit>, Error> {
    connection
        .prepare(
            "SELECT user_id, category, amount FROM budget_limit
             WHERE user_id = ?1 AND category = ?2",
        )?
        .query_row((user_id.as_i64(), category.as_ref()), map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve all of a user's limits ordered alphabetically by category.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_budget_limits(user_id: UserID, connection: &Connection) -> Result<Vec<BudgetLimit>, Error> {
    connection
        .prepare(
            "SELECT user_id, category, amount FROM budget_limit
             WHERE user_id = :user_id
             ORDER BY category ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_limit| maybe_limit.map_err(|error| error.into()))
        .collect()
}

/// Record that the breach of a limit has been alerted.
///
/// Returns `true` only for the call that flips the flag, so concurrent or
/// repeated breaches produce a single alert.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn mark_breach_notified(
    user_id: UserID,
    category: &CategoryName,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "UPDATE budget_limit SET breach_notified = 1
         WHERE user_id = ?1 AND category = ?2 AND breach_notified = 0",
        (user_id.as_i64(), category.as_ref()),
    )?;

    Ok(rows_affected == 1)
}

/// Re-arm the alert for a limit after spending was seen below it.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn clear_breach_notified(
    user_id: UserID,
    category: &CategoryName,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE budget_limit SET breach_notified = 0
         WHERE user_id = ?1 AND category = ?2 AND breach_notified = 1",
        (user_id.as_i64(), category.as_ref()),
    )?;

    Ok(())
}

/// Initialize the budget limit table.
pub fn create_budget_limit_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget_limit (
            user_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            amount TEXT NOT NULL CHECK (CAST(amount AS REAL) > 0),
            breach_notified INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, category),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<BudgetLimit, rusqlite::Error> {
    let user_id = UserID::new(row.get(0)?);
    let raw_category: String = row.get(1)?;
    let limit = get_decimal(row, 2)?;

    Ok(BudgetLimit {
        user_id,
        category: CategoryName::new_unchecked(&raw_category),
        limit,
    })
}
