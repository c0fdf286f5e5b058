//! Project cache: the last fully enriched node set, persisted between runs.
//!
//! The cache only exists so the picker can render immediately at startup;
//! a live discovery pass always follows and wins.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "saved_at": "2026-01-01T10:00:00Z",
//!   "nodes": [ { "path": "...", "kind": "repository", ... } ]
//! }
//! ```
//!
//! # Defensive Design
//!
//! - Missing, empty, corrupt or wrong-version files load as "no cache"
//! - Writes use temp file + rename so a crash never leaves a truncated cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, SessionizerError};
use crate::storage::write_atomic;
use crate::workspace::WorkspaceNode;

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    saved_at: DateTime<Utc>,
    nodes: Vec<WorkspaceNode>,
}

/// A successfully loaded cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedProjects {
    pub saved_at: DateTime<Utc>,
    pub nodes: Vec<WorkspaceNode>,
}

#[derive(Debug, Clone)]
pub struct ProjectCache {
    file_path: PathBuf,
}

impl ProjectCache {
    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Reads the cache. Every failure mode degrades to `None`.
    pub fn load(&self) -> Option<CachedProjects> {
        let content = match fs_err::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(error = %err, "Failed to read project cache");
                return None;
            }
        };

        if content.trim().is_empty() {
            warn!(path = %self.file_path.display(), "Empty project cache");
            return None;
        }

        match serde_json::from_str::<CacheFile>(&content) {
            Ok(file) if file.version == CACHE_VERSION => Some(CachedProjects {
                saved_at: file.saved_at,
                nodes: file.nodes,
            }),
            Ok(file) => {
                warn!(
                    version = file.version,
                    expected = CACHE_VERSION,
                    "Unsupported project cache version"
                );
                None
            }
            Err(err) => {
                warn!(error = %err, "Failed to parse project cache");
                None
            }
        }
    }

    pub fn save(&self, nodes: &[WorkspaceNode]) -> Result<()> {
        let file = CacheFile {
            version: CACHE_VERSION,
            saved_at: Utc::now(),
            nodes: nodes.to_vec(),
        };

        let content = serde_json::to_string(&file).map_err(|source| SessionizerError::Json {
            context: "serializing project cache".to_string(),
            source,
        })?;

        write_atomic(&self.file_path, content.as_bytes())
            .map_err(|e| SessionizerError::io("writing project cache", e))
    }
}
