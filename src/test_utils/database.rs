use rusqlite::Connection;

use crate::{
    db::initialize,
    user::{User, create_user},
};

pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&conn).expect("Could not initialize database");
    conn
}

pub(crate) fn get_test_connection_with_user() -> (Connection, User) {
    let conn = get_test_connection();
    let user = create_user("jo@example.com", "jo", &conn).expect("Could not create test user");
    (conn, user)
}
