use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::CacheError;

pub const SEEN_SNAPSHOT_VERSION: u32 = 1;

/// Post ids and post URLs that were already handled. The two kinds share one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    entries: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeenSnapshot {
    version: u32,
    entries: Vec<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Returns true when the key was not present before.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.entries.insert(key.into())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_snapshot(&self) -> Result<String, CacheError> {
        let snapshot = SeenSnapshot {
            version: SEEN_SNAPSHOT_VERSION,
            entries: self.entries.iter().cloned().collect(),
        };
        serde_json::to_string(&snapshot).map_err(|e| CacheError::MalformedSnapshot {
            details: e.to_string(),
        })
    }

    pub fn from_snapshot(data: &str) -> Result<Self, CacheError> {
        let snapshot: SeenSnapshot =
            serde_json::from_str(data).map_err(|e| CacheError::MalformedSnapshot {
                details: e.to_string(),
            })?;
        if snapshot.version != SEEN_SNAPSHOT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: snapshot.version,
                expected: SEEN_SNAPSHOT_VERSION,
            });
        }
        Ok(Self {
            entries: snapshot.entries.into_iter().collect(),
        })
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}
