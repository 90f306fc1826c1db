use async_trait::async_trait;
use mirror_core::{CacheError, SeenSet, SeenStore};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BACKEND: &str = "file";

/// Seen-set kept as one JSON snapshot on local disk.
#[derive(Debug, Clone)]
pub struct FileSeenStore {
    path: PathBuf,
}

impl FileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn backend_error(path: &Path, error: impl std::fmt::Display) -> CacheError {
    CacheError::Backend {
        backend: BACKEND.to_string(),
        details: format!("{}: {}", path.display(), error),
    }
}

#[async_trait]
impl SeenStore for FileSeenStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn load(&self) -> Result<SeenSet, CacheError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No seen-set at {}, starting empty", self.path.display());
                return Ok(SeenSet::new());
            }
            Err(e) => return Err(backend_error(&self.path, e)),
        };

        if data.trim().is_empty() {
            return Ok(SeenSet::new());
        }

        let seen = SeenSet::from_snapshot(&data)?;
        info!(
            "Loaded {} seen entries from {}",
            seen.len(),
            self.path.display()
        );
        Ok(seen)
    }

    async fn save(&self, seen: &SeenSet) -> Result<(), CacheError> {
        let snapshot = seen.to_snapshot()?;
        let temp_path = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| backend_error(parent, e))?;
        }

        tokio::fs::write(&temp_path, snapshot)
            .await
            .map_err(|e| backend_error(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| backend_error(&self.path, e))?;

        debug!("Saved {} seen entries to {}", seen.len(), self.path.display());
        Ok(())
    }
}
