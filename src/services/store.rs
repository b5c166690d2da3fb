//! Durable snapshot stores.
//!
//! A store holds one JSON blob per key and replaces it whole on every write.
//! Three backends are provided:
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`FileStore`], one file per key, written via temp file + fsync + rename
//! - [`RedisStore`], plain `SET` without expiry and `MULTI` for batches

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on snapshot '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the snapshot under `key`. Either the whole value lands or nothing does.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Replace several snapshots as one unit.
    ///
    /// The default applies the writes in order and, if one fails, restores the
    /// keys it already touched to their previous values.
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut previous = Vec::with_capacity(entries.len());
        for (key, _) in &entries {
            previous.push(self.get(key).await?);
        }

        for (index, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value.clone()).await {
                for ((done_key, _), old) in entries.iter().zip(&previous).take(index) {
                    let restored = match old {
                        Some(old) => self.set(done_key, old.clone()).await,
                        None => self.remove(done_key).await,
                    };
                    if let Err(restore_err) = restored {
                        error!(key = %done_key, error = %restore_err, "Failed to restore snapshot after batch failure");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut map = self.entries.write();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Ok(())
    }
}

/// One JSON file per key inside `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store, making sure the directory exists.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                key: dir.display().to_string(),
                source,
            })?;
        tracing::info!(dir = %dir.display(), "File snapshot store opened");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    async fn atomic_write(key: &str, path: &Path, data: &str) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };
        let temp_path = path.with_extension("tmp");

        let mut file = tokio::fs::File::create(&temp_path).await.map_err(io_err)?;
        file.write_all(data.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        tokio::fs::rename(&temp_path, path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        Self::atomic_write(key, &self.path_for(key), &value).await?;
        debug!(key = key, "Snapshot written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let meta = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                key: self.dir.display().to_string(),
                source,
            })?;
        if meta.permissions().readonly() {
            return Err(StoreError::Unavailable(format!(
                "{} is read-only",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

/// Redis-backed store with connection pooling via ConnectionManager.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!("Redis snapshot store connected");

        Ok(Self { conn })
    }
}

#[async_trait]
impl SnapshotStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(|e| {
            warn!(key = key, error = %e, "Redis get error");
            e
        })?;
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        debug!(key = key, "Snapshot written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    #[instrument(skip(self, entries), fields(keys = entries.len()))]
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in &entries {
            pipe.set(key, value).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Snapshot key builders, one key per logical table.
pub mod keys {
    pub const PRICE_ITEMS: &str = "bidsync:price_items";
    pub const ARTIFACTS: &str = "bidsync:artifacts";
    pub const ESTIMATES: &str = "bidsync:estimates";
}
