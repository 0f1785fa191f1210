//! Redis cache backend.

use crate::{CacheSettings, REDIS_PORT};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ConnectionInfo, IntoConnectionInfo, RedisError};
use std::time::Duration;
use tokio::sync::OnceCell;
use versa_error::{CacheError, CacheErrorKind};

const DEFAULT_HOST: &str = "localhost";

fn backend_error(err: RedisError) -> CacheError {
    CacheError::new(CacheErrorKind::Backend(err.to_string()))
}

/// Address, database number and password from `settings`.
pub(crate) fn connection_info(settings: &CacheSettings) -> Result<ConnectionInfo, CacheError> {
    let host = settings
        .host
        .clone()
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = settings.effective_port().unwrap_or(REDIS_PORT);

    let mut info = (host, port).into_connection_info().map_err(backend_error)?;
    info.redis.db = i64::from(settings.db);
    info.redis.password = settings.password.clone();
    Ok(info)
}

/// Whole seconds for `SET EX`, rounded up so short TTLs still expire.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis().div_ceil(1000))
        .unwrap_or(u64::MAX)
        .max(1)
}

/// Client plus a connection manager opened on first use.
pub(crate) struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisStore {
    /// Client for `settings`. No connection is made yet.
    pub(crate) fn open(settings: &CacheSettings) -> Result<Self, CacheError> {
        let client = Client::open(connection_info(settings)?).map_err(backend_error)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::debug!("Connecting to Redis");
                ConnectionManager::new(self.client.clone()).await
            })
            .await
            .map_err(backend_error)?;
        Ok(manager.clone())
    }

    pub(crate) async fn set(
        &self,
        key: &str,
        payload: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, payload, ttl_seconds(ttl)).await,
            None => conn.set::<_, _, ()>(key, payload).await,
        }
        .map_err(backend_error)
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get(key).await.map_err(backend_error)
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: usize = conn.del(key).await.map_err(backend_error)?;
        Ok(removed > 0)
    }

    /// Keys under `namespace`.
    pub(crate) async fn keys(&self, namespace: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.keys(format!("{namespace}:*"))
            .await
            .map_err(backend_error)
    }

    /// Remove every key under `namespace`, returning how many went.
    pub(crate) async fn clear(&self, namespace: &str) -> Result<usize, CacheError> {
        let keys = self.keys(namespace).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        conn.del(keys).await.map_err(backend_error)
    }
}
