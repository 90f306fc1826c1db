use async_trait::async_trait;
use mirror_core::{CacheError, SeenSet, SeenStore};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

const BACKEND: &str = "redis";

/// Seen-set kept as one snapshot string under a single Redis key.
pub struct RedisSeenStore {
    client: redis::Client,
    key: String,
}

impl RedisSeenStore {
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(backend_error)?;
        Ok(Self {
            client,
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)
    }
}

fn backend_error(error: redis::RedisError) -> CacheError {
    CacheError::Backend {
        backend: BACKEND.to_string(),
        details: error.to_string(),
    }
}

#[async_trait]
impl SeenStore for RedisSeenStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn load(&self) -> Result<SeenSet, CacheError> {
        let mut connection = self.connection().await?;
        let data: Option<String> = connection.get(&self.key).await.map_err(backend_error)?;

        match data.filter(|data| !data.trim().is_empty()) {
            Some(data) => {
                let seen = SeenSet::from_snapshot(&data)?;
                info!("Loaded {} seen entries from redis key {}", seen.len(), self.key);
                Ok(seen)
            }
            None => {
                info!("Redis key {} is empty, starting empty", self.key);
                Ok(SeenSet::new())
            }
        }
    }

    async fn save(&self, seen: &SeenSet) -> Result<(), CacheError> {
        let snapshot = seen.to_snapshot()?;
        let mut connection = self.connection().await?;
        connection
            .set::<_, _, ()>(&self.key, snapshot)
            .await
            .map_err(backend_error)?;
        debug!("Saved {} seen entries to redis key {}", seen.len(), self.key);
        Ok(())
    }
}
