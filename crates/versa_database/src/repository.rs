//! Async facade over [`Model`] operations.

use crate::connection::DbConn;
use crate::{DatabaseResult, DbPool, Model};
use tracing::{debug, instrument};
use versa_error::{DatabaseError, DatabaseErrorKind};

/// Runs blocking diesel calls on the Tokio blocking pool.
///
/// # Example
///
/// ```no_run
/// use versa_database::{DbPool, GuildRow, Repository};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = Repository::new(DbPool::sqlite_in_memory()?);
/// let guild: Option<GuildRow> = repo.find(1234).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check out a connection and run `op` on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> DatabaseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbConn) -> DatabaseResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query(e.to_string())))?
    }

    /// Load a record by key.
    #[instrument(skip(self), fields(model = M::NAME))]
    pub async fn find<M: Model>(&self, key: M::Key) -> DatabaseResult<Option<M>> {
        self.run(move |conn| M::find(conn, &key)).await
    }

    /// Insert a new record.
    #[instrument(skip(self, model), fields(model = M::NAME, key = ?model.key()))]
    pub async fn insert<M: Model>(&self, model: M) -> DatabaseResult<M> {
        self.run(move |conn| {
            model.insert(conn)?;
            Ok(model)
        })
        .await
    }

    /// Write a record, inserting it when no row has its key.
    #[instrument(skip(self, model), fields(model = M::NAME, key = ?model.key()))]
    pub async fn save<M: Model>(&self, mut model: M) -> DatabaseResult<M> {
        model.touch();
        self.run(move |conn| {
            model.upsert(conn)?;
            Ok(model)
        })
        .await
    }

    /// Delete a record, returning whether a row was removed.
    #[instrument(skip(self), fields(model = M::NAME))]
    pub async fn delete<M: Model>(&self, key: M::Key) -> DatabaseResult<bool> {
        let removed = self.run(move |conn| M::delete(conn, &key)).await?;
        debug!(removed, "Deleted record");
        Ok(removed > 0)
    }

    /// Load the record with `key`, inserting `make()` when it is missing.
    ///
    /// Returns the record and whether it was created. A row written by
    /// someone else between the lookup and the insert is returned as found.
    #[instrument(skip(self, make), fields(model = M::NAME))]
    pub async fn get_or_create<M, F>(&self, key: M::Key, make: F) -> DatabaseResult<(M, bool)>
    where
        M: Model,
        F: FnOnce() -> M + Send + 'static,
    {
        self.run(move |conn| match M::find(conn, &key)? {
            Some(model) => Ok((model, false)),
            None => insert_or_find(conn, make()),
        })
        .await
    }

    /// Insert `model`, or load the stored row when its key is taken.
    ///
    /// Returns the record and whether it was created.
    #[instrument(skip(self, model), fields(model = M::NAME, key = ?model.key()))]
    pub async fn insert_or_get<M: Model>(&self, model: M) -> DatabaseResult<(M, bool)> {
        self.run(move |conn| insert_or_find(conn, model)).await
    }
}

fn insert_or_find<M: Model>(conn: &mut DbConn, model: M) -> DatabaseResult<(M, bool)> {
    match model.insert(conn) {
        Ok(()) => Ok((model, true)),
        Err(e) if e.is_already_exists() => {
            debug!(key = ?model.key(), "Record written concurrently, loading it");
            match M::find(conn, &model.key())? {
                Some(stored) => Ok((stored, false)),
                None => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}
