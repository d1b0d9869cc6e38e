use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;
use tracing::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Failed to configure database: {0}")]
    Setup(#[from] diesel::result::Error),

    #[error("Failed to run migrations: {0}")]
    Migration(String),
}

/// Opens the database, enables foreign keys and applies pending migrations.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection, DatabaseError> {
    let mut connection = SqliteConnection::establish(database_url)?;

    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| DatabaseError::Migration(err.to_string()))?;

    info!(applied = applied.len(), "Database migrations up to date");

    Ok(connection)
}
