//! Connection pooling across the supported backends.
//!
//! Diesel connections are backend specific, so the pool is an enum over a
//! PostgreSQL and a SQLite r2d2 pool. Queries are written once and expanded
//! for both backends by [`with_connection!`].

use crate::DatabaseResult;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use versa_error::{DatabaseError, DatabaseErrorKind};

/// PostgreSQL connection pool.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// SQLite connection pool.
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Default pool size for server backends.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Database backend selected by `DB_TYPE`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Backend {
    /// Local SQLite file (the default)
    #[default]
    Sqlite,
    /// PostgreSQL server
    Postgres,
}

impl Backend {
    /// Port used when none is configured.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Backend::Sqlite => None,
            Backend::Postgres => Some(5432),
        }
    }
}

/// Connection pool for either backend.
#[derive(Clone)]
pub enum DbPool {
    /// PostgreSQL pool
    Postgres(PgPool),
    /// SQLite pool
    Sqlite(SqlitePool),
}

/// A connection checked out of a [`DbPool`].
pub enum DbConn {
    /// PostgreSQL connection
    Postgres(PooledConnection<ConnectionManager<PgConnection>>),
    /// SQLite connection
    Sqlite(PooledConnection<ConnectionManager<SqliteConnection>>),
}

impl std::fmt::Debug for DbPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbPool")
            .field("backend", &self.backend())
            .finish()
    }
}

impl DbPool {
    /// Build a pool for `backend` at `url`.
    ///
    /// SQLite pools hold a single connection; the file is not safe to write
    /// from several connections at once.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the first connection cannot be opened.
    #[instrument(skip(url), fields(backend = %backend))]
    pub fn connect(backend: Backend, url: &str, max_size: u32) -> DatabaseResult<Self> {
        info!("Opening database connection pool");
        let pool = match backend {
            Backend::Postgres => {
                let manager = ConnectionManager::<PgConnection>::new(url);
                DbPool::Postgres(Pool::builder().max_size(max_size).build(manager).map_err(
                    |e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())),
                )?)
            }
            Backend::Sqlite => {
                let manager = ConnectionManager::<SqliteConnection>::new(url);
                DbPool::Sqlite(Pool::builder().max_size(1).build(manager).map_err(|e| {
                    DatabaseError::new(DatabaseErrorKind::Connection(e.to_string()))
                })?)
            }
        };
        debug!("Database pool ready");
        Ok(pool)
    }

    /// Private in-memory SQLite database, mostly for tests.
    pub fn sqlite_in_memory() -> DatabaseResult<Self> {
        Self::connect(Backend::Sqlite, ":memory:", 1)
    }

    /// Backend this pool talks to.
    pub fn backend(&self) -> Backend {
        match self {
            DbPool::Postgres(_) => Backend::Postgres,
            DbPool::Sqlite(_) => Backend::Sqlite,
        }
    }

    /// Check out a connection, blocking until one is free.
    pub fn get(&self) -> DatabaseResult<DbConn> {
        Ok(match self {
            DbPool::Postgres(pool) => DbConn::Postgres(pool.get()?),
            DbPool::Sqlite(pool) => DbConn::Sqlite(pool.get()?),
        })
    }
}

/// Run `$body` with `$c` bound to the concrete diesel connection.
macro_rules! with_connection {
    ($conn:expr, |$c:ident| $body:expr) => {
        match $conn {
            $crate::DbConn::Postgres(pooled) => {
                let $c: &mut diesel::pg::PgConnection = &mut **pooled;
                $body
            }
            $crate::DbConn::Sqlite(pooled) => {
                let $c: &mut diesel::sqlite::SqliteConnection = &mut **pooled;
                $body
            }
        }
    };
}

pub(crate) use with_connection;
