//! Embedded schema migrations.

use crate::connection::DbConn;
use crate::{DatabaseResult, DbPool};
use diesel::pg::PgConnection;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, instrument};
use versa_error::{DatabaseError, DatabaseErrorKind};

/// Migrations for PostgreSQL.
pub const POSTGRES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

/// Migrations for SQLite.
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Apply every pending migration and return the versions that ran.
///
/// # Errors
///
/// Returns a migration error if any migration fails; earlier migrations
/// stay applied.
#[instrument(skip(pool), fields(backend = %pool.backend()))]
pub fn run_migrations(pool: &DbPool) -> DatabaseResult<Vec<String>> {
    let mut conn = pool.get()?;
    let applied = match &mut conn {
        DbConn::Postgres(pooled) => {
            let conn: &mut PgConnection = &mut **pooled;
            conn.run_pending_migrations(POSTGRES_MIGRATIONS)
                .map(|versions| versions.iter().map(ToString::to_string).collect::<Vec<_>>())
        }
        DbConn::Sqlite(pooled) => {
            let conn: &mut SqliteConnection = &mut **pooled;
            conn.run_pending_migrations(SQLITE_MIGRATIONS)
                .map(|versions| versions.iter().map(ToString::to_string).collect::<Vec<_>>())
        }
    }
    .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))?;

    info!(count = applied.len(), "Applied migrations");
    Ok(applied)
}
