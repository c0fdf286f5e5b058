//! Discovery service: turns configured search roots into workspace nodes.
//!
//! Classification is purely structural:
//!
//! | Directory contains                                   | Kind                 |
//! |------------------------------------------------------|----------------------|
//! | `grove.yml` with a top-level `workspaces:` key       | Ecosystem            |
//! | `.git` file whose gitdir has a `commondir`           | RepositoryWorktree   |
//! | same, plus an ecosystem `grove.yml`                  | EcosystemWorktree    |
//! | `.git` directory and a `grove.yml`                   | Repository           |
//! | `.git` directory, no `grove.yml`                     | NonGroveClone        |
//!
//! A `.git` file without `commondir` is a submodule and is treated like a
//! checkout of its own.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SessionizerConfig;
use crate::error::{Result, SessionizerError};
use crate::paths::{canonicalize_path, is_same_or_descendant, path_to_string};
use crate::storage::write_atomic;
use crate::workspace::{ProjectKind, WorkspaceNode};

const PROJECT_MARKER: &str = "grove.yml";
const ACCESS_HISTORY_LIMIT: usize = 100;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];
/// Hidden directories that conventionally hold worktrees and are walked anyway.
const WORKTREE_DIRS: &[&str] = &[".worktrees", ".grove-worktrees"];

pub trait Discovery: Send + Sync {
    fn discover(&self) -> Result<Vec<WorkspaceNode>>;
    /// Recently opened project paths, most recent first.
    fn access_history(&self) -> Vec<String>;
    fn record_access(&self, path: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FsDiscovery {
    search_roots: Vec<String>,
    explicit_projects: Vec<String>,
    exclude: Vec<String>,
    max_depth: usize,
    history_file: PathBuf,
}

impl FsDiscovery {
    pub fn new(config: &SessionizerConfig, history_file: PathBuf) -> Self {
        let canonical = |paths: &[String]| -> Vec<String> {
            paths.iter().map(|p| canonicalize_path(p)).collect()
        };
        Self {
            search_roots: canonical(&config.search_roots),
            explicit_projects: canonical(&config.explicit_projects),
            exclude: canonical(&config.exclude),
            max_depth: config.max_depth.max(1),
            history_file,
        }
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude
            .iter()
            .any(|prefix| is_same_or_descendant(prefix, path))
    }

    fn walk_root(&self, root: &str, found: &mut BTreeMap<String, WorkspaceNode>) {
        if !Path::new(root).is_dir() {
            tracing::warn!(root = %root, "Search root is not a directory");
            return;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || (entry.file_type().is_dir() && !skip_dir(entry.path()))
            });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = path_to_string(entry.path());
            if self.is_excluded(&path) {
                continue;
            }
            if let Some(node) = classify_dir(entry.path()) {
                found.entry(node.path.clone()).or_insert(node);
            }
        }
    }
}

impl Discovery for FsDiscovery {
    fn discover(&self) -> Result<Vec<WorkspaceNode>> {
        let mut found: BTreeMap<String, WorkspaceNode> = BTreeMap::new();

        for root in &self.search_roots {
            self.walk_root(root, &mut found);
        }

        for project in &self.explicit_projects {
            let dir = Path::new(project);
            if !dir.is_dir() {
                tracing::warn!(path = %project, "Explicit project is not a directory");
                continue;
            }
            let node = classify_dir(dir)
                .unwrap_or_else(|| WorkspaceNode::new(project.clone(), ProjectKind::NonGroveClone));
            found.entry(node.path.clone()).or_insert(node);
        }

        found.retain(|path, _| !self.is_excluded(path));

        let mut nodes: Vec<WorkspaceNode> = found.into_values().collect();
        assign_ecosystems(&mut nodes);

        tracing::info!(count = nodes.len(), "Discovery complete");
        Ok(nodes)
    }

    fn access_history(&self) -> Vec<String> {
        load_history(&self.history_file)
    }

    fn record_access(&self, path: &str) -> Result<()> {
        let path = canonicalize_path(path);
        let mut history = load_history(&self.history_file);
        history.retain(|p| p != &path);
        history.insert(0, path);
        history.truncate(ACCESS_HISTORY_LIMIT);
        save_history(&self.history_file, &history)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════════════════════════════════════════

fn skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    if SKIPPED_DIRS.contains(&name) {
        return true;
    }
    name.starts_with('.') && !WORKTREE_DIRS.contains(&name)
}

/// Classifies one directory, or `None` when it is not a project.
pub fn classify_dir(dir: &Path) -> Option<WorkspaceNode> {
    let path = canonicalize_path(&dir.to_string_lossy());
    let marker = read_marker(dir);
    let git_entry = dir.join(".git");

    if git_entry.is_file() {
        if let Some(main_checkout) = worktree_source(&git_entry, dir) {
            let kind = if marker == Marker::Ecosystem {
                ProjectKind::EcosystemWorktree
            } else {
                ProjectKind::RepositoryWorktree
            };
            return Some(WorkspaceNode::new(path, kind).with_parent_project(main_checkout));
        }
    }

    let has_git = git_entry.exists();
    let kind = match (marker, has_git) {
        (Marker::Ecosystem, _) => ProjectKind::Ecosystem,
        (Marker::Project, true) => ProjectKind::Repository,
        (Marker::None, true) => ProjectKind::NonGroveClone,
        (_, false) => return None,
    };
    Some(WorkspaceNode::new(path, kind))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    None,
    Project,
    Ecosystem,
}

fn read_marker(dir: &Path) -> Marker {
    let Ok(contents) = std::fs::read_to_string(dir.join(PROJECT_MARKER)) else {
        return Marker::None;
    };
    if contents
        .lines()
        .any(|line| line.starts_with("workspaces:"))
    {
        Marker::Ecosystem
    } else {
        Marker::Project
    }
}

/// Working directory of the main checkout a linked worktree belongs to.
fn worktree_source(git_file: &Path, worktree_root: &Path) -> Option<String> {
    let git_dir = parse_gitdir(git_file, worktree_root)?;
    let common_dir = parse_commondir(&git_dir)?;
    let main_checkout = if common_dir.file_name().and_then(|n| n.to_str()) == Some(".git") {
        common_dir.parent()?.to_path_buf()
    } else {
        // Bare repository: the common dir itself is the identity.
        common_dir
    };
    Some(canonicalize_path(&main_checkout.to_string_lossy()))
}

fn parse_gitdir(git_file: &Path, worktree_root: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(git_file).ok()?;
    let line = contents
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("gitdir:"))?;
    let raw = line.get("gitdir:".len()..)?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(resolve_git_path(worktree_root, raw))
}

fn parse_commondir(git_dir: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(git_dir.join("commondir")).ok()?;
    let raw = contents.trim();
    if raw.is_empty() {
        return None;
    }
    Some(resolve_git_path(git_dir, raw))
}

fn resolve_git_path(base: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    PathBuf::from(canonicalize_path(&joined.to_string_lossy()))
}

/// Sets parent/root ecosystem pointers from directory nesting. The nearest
/// enclosing ecosystem (or ecosystem worktree) is the parent; the outermost
/// is the root.
fn assign_ecosystems(nodes: &mut [WorkspaceNode]) {
    let ecosystems: Vec<String> = nodes
        .iter()
        .filter(|n| n.is_ecosystem())
        .map(|n| n.path.clone())
        .collect();

    for node in nodes.iter_mut() {
        let enclosing: Vec<&String> = ecosystems
            .iter()
            .filter(|eco| **eco != node.path && is_same_or_descendant(eco, &node.path))
            .collect();
        let nearest = enclosing.iter().max_by_key(|eco| eco.len());
        let outermost = enclosing.iter().min_by_key(|eco| eco.len());
        if let (Some(parent), Some(root)) = (nearest, outermost) {
            node.parent_ecosystem_path = Some((*parent).clone());
            node.root_ecosystem_path = Some((*root).clone());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access History
// ═══════════════════════════════════════════════════════════════════════════════

fn load_history(path: &Path) -> Vec<String> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read access history");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<String>>(&content) {
        Ok(history) => history,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse access history");
            Vec::new()
        }
    }
}

fn save_history(path: &Path, history: &[String]) -> Result<()> {
    let content = serde_json::to_string_pretty(history).map_err(|source| SessionizerError::Json {
        context: "serializing access history".to_string(),
        source,
    })?;

    write_atomic(path, content.as_bytes())
        .map_err(|e| SessionizerError::io("writing access history", e))
}
