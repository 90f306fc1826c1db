use mirror_core::{CacheBackend, CacheError, SeenSet, SeenStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod file;
pub mod redis_store;


pub use file::FileSeenStore;
pub use redis_store::RedisSeenStore;

/// When changes to the in-memory set reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Saved by an explicit `flush`, normally at shutdown.
    OnShutdown,
    /// Saved after every change.
    Incremental,
    /// Never saved.
    Disabled,
}

impl PersistMode {
    pub fn for_backend(backend: CacheBackend, dry_run: bool) -> Self {
        match (dry_run, backend) {
            (true, _) => PersistMode::Disabled,
            (false, CacheBackend::File) => PersistMode::OnShutdown,
            (false, CacheBackend::Redis) => PersistMode::Incremental,
        }
    }
}

/// In-memory seen-set bound to the backend it was loaded from.
pub struct SeenCache {
    seen: SeenSet,
    store: Arc<dyn SeenStore>,
    mode: PersistMode,
    dirty: bool,
}

impl SeenCache {
    pub async fn load(store: Arc<dyn SeenStore>, mode: PersistMode) -> Result<Self, CacheError> {
        let seen = store.load().await?;
        info!(
            "Seen-set ready: {} entries from {} backend ({:?})",
            seen.len(),
            store.backend_name(),
            mode
        );
        Ok(Self::with_set(seen, store, mode))
    }

    pub fn with_set(seen: SeenSet, store: Arc<dyn SeenStore>, mode: PersistMode) -> Self {
        Self {
            seen,
            store,
            mode,
            dirty: false,
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub async fn insert(&mut self, key: impl Into<String>) -> Result<bool, CacheError> {
        self.insert_many([key.into()]).await
    }

    /// Adds every key, saving once when persisting incrementally.
    /// Returns true when at least one key was new.
    pub async fn insert_many<I>(&mut self, keys: I) -> Result<bool, CacheError>
    where
        I: IntoIterator<Item = String> + Send,
        I::IntoIter: Send,
    {
        let mut added = false;
        for key in keys {
            if self.seen.insert(key.clone()) {
                debug!("Marked {} as seen", key);
                added = true;
            }
        }
        if added {
            self.dirty = true;
            self.persist_incremental().await?;
        }
        Ok(added)
    }

    /// Manual removal; the only way the set shrinks.
    pub async fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        let removed = self.seen.remove(key);
        if removed {
            info!("Removed {} from the seen-set", key);
            self.dirty = true;
            self.persist_incremental().await?;
        } else {
            warn!("{} was not in the seen-set", key);
        }
        Ok(removed)
    }

    /// Writes pending changes unless persistence is disabled.
    pub async fn flush(&mut self) -> Result<(), CacheError> {
        if self.mode == PersistMode::Disabled {
            debug!("Seen-set persistence disabled, skipping flush");
            return Ok(());
        }
        if !self.dirty {
            return Ok(());
        }
        self.store.save(&self.seen).await?;
        self.dirty = false;
        info!(
            "Flushed {} seen entries to {} backend",
            self.seen.len(),
            self.store.backend_name()
        );
        Ok(())
    }

    async fn persist_incremental(&mut self) -> Result<(), CacheError> {
        if self.mode != PersistMode::Incremental {
            return Ok(());
        }
        self.store.save(&self.seen).await?;
        self.dirty = false;
        Ok(())
    }
}
