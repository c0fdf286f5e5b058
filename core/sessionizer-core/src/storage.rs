//! Storage configuration and path management.
//!
//! Every file the sessionizer reads or writes lives under one root directory,
//! so tests can point the whole program at a temp dir with
//! [`StorageConfig::with_root`].
//!
//! ```text
//! <root>/config.toml                 configuration store
//! <root>/tmux-bindings.conf          generated binding artifact (machine-owned)
//! <root>/cache/projects.json         project cache
//! <root>/state/access-history.json   recently opened projects
//! <root>/logs/                       rolling log files
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, SessionizerError};

/// Environment variable that overrides the default root.
pub const CONFIG_DIR_ENV: &str = "SESSIONIZER_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root: explicit override, then `$SESSIONIZER_CONFIG_DIR`,
    /// then the platform config directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let root = explicit
            .or_else(|| std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from))
            .or_else(|| dirs::config_dir().map(|d| d.join("sessionizer")))
            .ok_or(SessionizerError::NoConfigDir)?;
        Ok(Self { root })
    }

    /// Creates a StorageConfig with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn bindings_artifact(&self) -> PathBuf {
        self.root.join("tmux-bindings.conf")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.root.join("cache").join("projects.json")
    }

    pub fn access_history_file(&self) -> PathBuf {
        self.root.join("state").join("access-history.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directory Checks
    // ─────────────────────────────────────────────────────────────────────────────

    /// Fails only when the root exists but cannot be listed. A missing root is
    /// the normal first-run state.
    pub fn check_readable(&self) -> Result<()> {
        match std::fs::read_dir(&self.root) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionizerError::ConfigDirUnreadable {
                path: self.root.clone(),
                source,
            }),
        }
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)?;
        fs_err::create_dir_all(self.root.join("cache"))?;
        fs_err::create_dir_all(self.root.join("state"))?;
        fs_err::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

/// Replaces `path` with `bytes` through a temp file in the same directory, so
/// readers see either the old content or the new, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no parent directory", path.display()),
            )
        })?;
    fs_err::create_dir_all(parent_dir)?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_parents_and_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("state.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn with_root_places_every_file_under_root() {
        let storage = StorageConfig::with_root(PathBuf::from("/tmp/sz"));
        for path in [
            storage.config_file(),
            storage.bindings_artifact(),
            storage.cache_file(),
            storage.access_history_file(),
            storage.logs_dir(),
        ] {
            assert!(path.starts_with("/tmp/sz"), "{}", path.display());
        }
    }

    #[test]
    fn explicit_root_wins() {
        let storage = StorageConfig::resolve(Some(PathBuf::from("/tmp/explicit"))).unwrap();
        assert_eq!(storage.root(), Path::new("/tmp/explicit"));
    }

    #[test]
    fn missing_root_is_readable() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().join("absent"));
        assert!(storage.check_readable().is_ok());
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().join("sz"));
        storage.ensure_dirs().unwrap();
        assert!(storage.cache_file().parent().unwrap().is_dir());
        assert!(storage.access_history_file().parent().unwrap().is_dir());
        assert!(storage.logs_dir().is_dir());
    }
}
