//! Diesel persistence layer for Versa.
//!
//! This crate owns the schema, the embedded migrations and the record types
//! that platform objects are wrapped with. Both SQLite (the default) and
//! PostgreSQL are supported through one pool type.
//!
//! # Example
//!
//! ```rust,no_run
//! use versa_database::{DbPool, Repository, UserRow, run_migrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::sqlite_in_memory()?;
//! run_migrations(&pool)?;
//!
//! let repo = Repository::new(pool);
//! repo.save(UserRow::new(42)).await?;
//! # Ok(())
//! # }
//! ```


mod connection;
mod migrations;
mod models;
mod repository;

pub mod schema;

pub use connection::{Backend, DEFAULT_POOL_SIZE, DbConn, DbPool, PgPool, SqlitePool};
pub use migrations::{POSTGRES_MIGRATIONS, SQLITE_MIGRATIONS, run_migrations};
pub use models::{
    ChannelKind, ChannelRow, CoreSettingsRow, EmojiRow, GuildRow, MemberRow, MessageRow, Model,
    ModelKind, RoleRow, UserRow, from_db_id, now, to_db_id,
};
pub use repository::Repository;

use versa_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
