//! Per-document content hashes from earlier sync passes.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    pub synced_at: DateTime<Utc>,
}

/// Hash cache keyed by absolute document path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub files: BTreeMap<String, FileRecord>,
}

impl SyncState {
    /// `state.json` under the platform local data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("mdcards").join("state.json"))
    }

    /// Load the cache; a missing or unreadable cache starts empty.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("could not read {}: {}", path.display(), e);
                }
                return Self::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!("discarding corrupt sync state {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Whether `key` was last synced with exactly this content.
    pub fn is_unchanged(&self, key: &str, hash: &str) -> bool {
        self.files.get(key).is_some_and(|record| record.hash == hash)
    }

    pub fn record(&mut self, key: impl Into<String>, hash: impl Into<String>) {
        self.files.insert(
            key.into(),
            FileRecord {
                hash: hash.into(),
                synced_at: Utc::now(),
            },
        );
    }
}
