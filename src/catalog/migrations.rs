//! Catalog schema setup
//!
//! The schema version lives in SQLite's `user_version` pragma. A fresh file
//! reads 0 and gets the embedded schema; a file from a newer build is refused
//! rather than guessed at.

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

/// Version written by this build
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = include_str!("migrations/001_initial.sql");

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Catalog schema version {found} is newer than supported version {}", SCHEMA_VERSION)]
    TooNew { found: u32 },
}

pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Bring the catalog up to [`SCHEMA_VERSION`], returning whether anything ran
pub fn migrate(conn: &Connection) -> Result<bool, MigrationError> {
    match schema_version(conn)? {
        SCHEMA_VERSION => Ok(false),
        0 => {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(SCHEMA)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
            info!(version = SCHEMA_VERSION, "Created catalog schema");
            Ok(true)
        }
        found => Err(MigrationError::TooNew { found }),
    }
}
