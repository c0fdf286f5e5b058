//! Configuration store (`config.toml`).
//!
//! Missing file → defaults. A file that exists but does not parse is a fatal
//! startup error: silently replacing a hand-edited config with defaults would
//! drop the operator's hotkeys on the next save.
//!
//! Saves go through a temp file + rename so a crash mid-write never leaves a
//! truncated config behind. Loading what was just saved reproduces the same
//! value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::enrichment::EnrichmentClass;
use crate::error::{Result, SessionizerError};
use crate::storage::write_atomic;

pub const DEFAULT_HOTKEY_ALPHABET: &str = "asdfghjkl";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_PROBE_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathDisplay {
    #[default]
    Name,
    Tilde,
    Full,
}

impl PathDisplay {
    pub fn next(self) -> Self {
        match self {
            PathDisplay::Name => PathDisplay::Tilde,
            PathDisplay::Tilde => PathDisplay::Full,
            PathDisplay::Full => PathDisplay::Name,
        }
    }
}

/// Which enrichment columns are shown (and therefore probed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub git: bool,
    pub agent: bool,
    pub notes: bool,
    pub plans: bool,
    pub rules: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            git: true,
            agent: true,
            notes: true,
            plans: true,
            rules: true,
        }
    }
}

impl Visibility {
    pub fn is_visible(&self, class: EnrichmentClass) -> bool {
        match class {
            EnrichmentClass::Git => self.git,
            EnrichmentClass::Agent => self.agent,
            EnrichmentClass::Notes => self.notes,
            EnrichmentClass::Plans => self.plans,
            EnrichmentClass::Rules => self.rules,
        }
    }
}

/// External commands backing the non-git probes. Unset means the attribute
/// is never populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeCommands {
    pub agent: Option<Vec<String>>,
    pub notes: Option<Vec<String>>,
    pub plans: Option<Vec<String>>,
    pub rules: Option<Vec<String>>,
}

impl ProbeCommands {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionizerConfig {
    pub search_roots: Vec<String>,
    pub explicit_projects: Vec<String>,
    pub exclude: Vec<String>,
    pub max_depth: usize,
    pub hotkey_alphabet: String,
    pub focus: Option<String>,
    pub fold_worktrees: bool,
    pub path_display: PathDisplay,
    pub refresh_interval_secs: u64,
    pub probe_concurrency: usize,
    pub key_table: String,
    /// Shell command bound to each hotkey; `{path}` is replaced by the project path.
    pub switch_command: String,
    /// Hotkey → project path.
    pub bindings: BTreeMap<String, String>,
    /// Project path → display name.
    pub aliases: BTreeMap<String, String>,
    pub visibility: Visibility,
    pub probes: ProbeCommands,
}

impl Default for SessionizerConfig {
    fn default() -> Self {
        Self {
            search_roots: Vec::new(),
            explicit_projects: Vec::new(),
            exclude: Vec::new(),
            max_depth: 3,
            hotkey_alphabet: DEFAULT_HOTKEY_ALPHABET.to_string(),
            focus: None,
            fold_worktrees: true,
            path_display: PathDisplay::Name,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            key_table: "prefix".to_string(),
            switch_command: "sessionizer '{path}'".to_string(),
            bindings: BTreeMap::new(),
            aliases: BTreeMap::new(),
            visibility: Visibility::default(),
            probes: ProbeCommands::default(),
        }
    }
}

impl SessionizerConfig {
    /// True when discovery has nothing to scan.
    pub fn needs_setup(&self) -> bool {
        self.search_roots.is_empty() && self.explicit_projects.is_empty()
    }

    pub fn hotkeys(&self) -> Vec<char> {
        let mut seen = Vec::new();
        for c in self.hotkey_alphabet.chars().filter(|c| !c.is_whitespace()) {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        seen
    }
}

/// Loads the configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<SessionizerConfig> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SessionizerConfig::default())
        }
        Err(err) => return Err(SessionizerError::io("reading configuration", err)),
    };

    toml::from_str(&content).map_err(|e| SessionizerError::ConfigMalformed {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

/// Saves the configuration atomically.
pub fn save_config(path: &Path, config: &SessionizerConfig) -> Result<()> {
    let write_failed = |details: String| SessionizerError::ConfigWriteFailed {
        path: path.to_path_buf(),
        details,
    };

    let content = toml::to_string_pretty(config)
        .map_err(|e| write_failed(format!("Failed to serialize: {}", e)))?;

    write_atomic(path, content.as_bytes()).map_err(|e| write_failed(e.to_string()))
}
