use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use budget_guard::{create_user, initialize_db};

/// A utility for adding a user to the budget_guard database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. Created if it does not exist.
    #[arg(long)]
    db_path: String,

    /// The address budget alerts are sent to.
    #[arg(long)]
    email: String,

    /// The name used to greet the user in alerts.
    #[arg(long)]
    username: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let db_path = Path::new(&args.db_path);

    match db_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    let conn = Connection::open(db_path)?;
    initialize_db(&conn)?;

    let user = create_user(&args.email, &args.username, &conn)?;

    println!("Created user {} with ID {}", user.email, user.id);

    Ok(())
}
