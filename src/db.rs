//! Sets up the application's SQLite database.

use std::str::FromStr;

use rusqlite::{Connection, Row, Transaction as SqlTransaction, types::Type};
use rust_decimal::Decimal;

use crate::{
    budget_limit::create_budget_limit_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the application's tables if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, so this should be
/// called on every new connection, not just when creating the database file.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    // Has no effect inside a transaction, so it must come first.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_limit_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Read a money column, which is stored as decimal text so that sums are exact.
pub(crate) fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::db::{get_decimal, initialize};

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let enabled: bool = connection
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }

    #[test]
    fn creates_all_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let mut tables: Vec<String> = connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|name| name.unwrap())
            .collect();
        tables.sort();

        assert_eq!(tables, vec!["budget_limit", "transaction", "user"]);
    }

    #[test]
    fn reads_decimal_text_exactly() {
        let connection = Connection::open_in_memory().unwrap();

        let value = connection
            .query_row("SELECT '0.10'", [], |row| get_decimal(row, 0))
            .unwrap();

        assert_eq!(value, dec!(0.1));
    }

    #[test]
    fn rejects_text_that_is_not_a_decimal() {
        let connection = Connection::open_in_memory().unwrap();

        let result = connection.query_row("SELECT 'ten'", [], |row| get_decimal(row, 0));

        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, _, _))
        ));
    }
}
