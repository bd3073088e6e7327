//! Redis-backed implementation of `banner_core::cache::Cache`.

use async_trait::async_trait;
use banner_core::cache::{Cache, CacheLookup};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;

/// A [`Cache`] backed by a Redis [`ConnectionManager`], which reconnects
/// internally and is cheap to clone, so one instance is shared across every
/// request handler.
///
/// # Remarks
///
/// Per the cache trait's contract, every Redis error (a dropped connection, a
/// timed-out command) is logged at `warn` and reported back as a miss or
/// silently dropped — a cache outage degrades read performance, it never
/// fails a request.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379`) and returns a cache
    /// backed by a managed, auto-reconnecting connection.
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheLookup {
        let mut connection = self.connection.clone();

        match connection.get::<_, Option<Vec<u8>>>(key).await {
            Ok(Some(value)) => CacheLookup::Hit(value),
            Ok(None) => CacheLookup::Miss,
            Err(error) => {
                tracing::warn!(%key, error = %error, "cache lookup failed, treating as a miss");
                CacheLookup::Miss
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut connection = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);

        if let Err(error) = connection
            .set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
        {
            tracing::warn!(%key, error = %error, "cache write failed, dropping");
        }
    }
}

#[cfg(test)]
mod tests {
    //! `RedisCache` needs a live server to exercise meaningfully; its
    //! contract (errors degrade to a miss / are swallowed) is covered by
    //! `banner_core::mem::MemCache`'s unit tests and by `banner-service`'s
    //! cache gateway tests, which run against that in-memory double.
}
