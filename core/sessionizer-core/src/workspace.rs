//! Workspace model: the typed tree of discoverable project directories.
//!
//! Nodes are flat values keyed by canonical path; the hierarchy is expressed
//! through parent pointers (`parent_project_path`, `parent_ecosystem_path`)
//! rather than owned children, so a node set can be replaced wholesale by a
//! discovery pass without invalidating anything that remembers a path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enrichment::EnrichmentStatus;

// ═══════════════════════════════════════════════════════════════════════════════
// Node Kinds
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    Repository,
    RepositoryWorktree,
    Ecosystem,
    EcosystemWorktree,
    NonGroveClone,
}

impl ProjectKind {
    pub fn label(self) -> &'static str {
        match self {
            ProjectKind::Repository => "repo",
            ProjectKind::RepositoryWorktree => "worktree",
            ProjectKind::Ecosystem => "ecosystem",
            ProjectKind::EcosystemWorktree => "eco-worktree",
            ProjectKind::NonGroveClone => "clone",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Enrichment Attributes
// ═══════════════════════════════════════════════════════════════════════════════

/// Working-tree status of a git checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    pub branch: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub modified: u32,
    pub staged: u32,
    pub untracked: u32,
    pub lines_added: u32,
    pub lines_deleted: u32,
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Running,
    Idle,
    Completed,
    Failed,
}

impl AgentState {
    /// Higher wins when several sessions map onto one node.
    pub fn priority(self) -> u8 {
        match self {
            AgentState::Running => 3,
            AgentState::Idle => 2,
            AgentState::Failed => 1,
            AgentState::Completed => 0,
        }
    }
}

/// External AI-agent session observed in a project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub state: AgentState,
    pub duration_secs: u64,
    /// Working directory the session was reported for. Differs from the node
    /// path when the match was propagated up from a worktree.
    pub working_directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCounts {
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub issues: u32,
    #[serde(default)]
    pub inbox: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub active: u32,
    #[serde(default)]
    pub completed: u32,
}

/// Context-inclusion classification reported by the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    None,
    Hot,
    Cold,
    Excluded,
}

impl RuleStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "none" => Some(RuleStatus::None),
            "hot" => Some(RuleStatus::Hot),
            "cold" => Some(RuleStatus::Cold),
            "excluded" => Some(RuleStatus::Excluded),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Workspace Node
// ═══════════════════════════════════════════════════════════════════════════════

/// A discovered project directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceNode {
    /// Canonical absolute path; unique across the model.
    pub path: String,
    pub name: String,
    pub kind: ProjectKind,
    #[serde(default)]
    pub parent_project_path: Option<String>,
    #[serde(default)]
    pub parent_ecosystem_path: Option<String>,
    #[serde(default)]
    pub root_ecosystem_path: Option<String>,

    #[serde(default)]
    pub git: Option<GitStatus>,
    #[serde(default)]
    pub agent: Option<AgentSession>,
    #[serde(default)]
    pub notes: Option<NoteCounts>,
    #[serde(default)]
    pub plans: Option<PlanStats>,
    #[serde(default)]
    pub rules: Option<RuleStatus>,

    /// In-flight bookkeeping; never persisted.
    #[serde(skip)]
    pub enrichment: EnrichmentStatus,
}

impl WorkspaceNode {
    pub fn new(path: impl Into<String>, kind: ProjectKind) -> Self {
        let path = path.into();
        Self {
            name: crate::paths::base_name(&path),
            path,
            kind,
            parent_project_path: None,
            parent_ecosystem_path: None,
            root_ecosystem_path: None,
            git: None,
            agent: None,
            notes: None,
            plans: None,
            rules: None,
            enrichment: EnrichmentStatus::default(),
        }
    }

    pub fn with_parent_project(mut self, parent: impl Into<String>) -> Self {
        self.parent_project_path = Some(parent.into());
        self
    }

    pub fn with_ecosystem(mut self, parent: impl Into<String>, root: impl Into<String>) -> Self {
        self.parent_ecosystem_path = Some(parent.into());
        self.root_ecosystem_path = Some(root.into());
        self
    }

    pub fn is_worktree(&self) -> bool {
        matches!(
            self.kind,
            ProjectKind::RepositoryWorktree | ProjectKind::EcosystemWorktree
        )
    }

    pub fn is_ecosystem(&self) -> bool {
        matches!(
            self.kind,
            ProjectKind::Ecosystem | ProjectKind::EcosystemWorktree
        )
    }

    /// Path of the bucket this node belongs to for activity grouping.
    pub fn grouping_key(&self) -> &str {
        match (&self.kind, &self.parent_project_path) {
            (ProjectKind::RepositoryWorktree, Some(parent)) => parent,
            _ => &self.path,
        }
    }

    /// Structural parent used for focus scoping and ordering.
    ///
    /// Priority: a repository worktree's source repository, then an
    /// ecosystem worktree's enclosing ecosystem, then nothing.
    pub fn hierarchical_parent(&self) -> Option<&str> {
        match self.kind {
            ProjectKind::RepositoryWorktree => self.parent_project_path.as_deref(),
            ProjectKind::EcosystemWorktree => self
                .parent_project_path
                .as_deref()
                .or(self.parent_ecosystem_path.as_deref()),
            _ => None,
        }
    }

    /// Copies every enrichment attribute and in-flight flag from `previous`.
    /// Used when a discovery pass replaces a node that was already enriched.
    pub fn inherit_enrichment(&mut self, previous: &WorkspaceNode) {
        self.git = previous.git.clone();
        self.agent = previous.agent.clone();
        self.notes = previous.notes.clone();
        self.plans = previous.plans.clone();
        self.rules = previous.rules;
        self.enrichment = previous.enrichment;
    }

    pub fn is_dirty(&self) -> bool {
        self.git.as_ref().is_some_and(|g| g.dirty)
    }
}

/// Applies configured display-name aliases in place.
pub fn apply_aliases(nodes: &mut [WorkspaceNode], aliases: &BTreeMap<String, String>) {
    for node in nodes {
        if let Some(alias) = aliases.get(&node.path).filter(|a| !a.trim().is_empty()) {
            node.name = alias.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_key_of_repository_worktree_is_parent() {
        let wt = WorkspaceNode::new("/code/app/.wt/fix", ProjectKind::RepositoryWorktree)
            .with_parent_project("/code/app");
        assert_eq!(wt.grouping_key(), "/code/app");
    }

    #[test]
    fn grouping_key_of_other_kinds_is_own_path() {
        for kind in [
            ProjectKind::Repository,
            ProjectKind::Ecosystem,
            ProjectKind::EcosystemWorktree,
            ProjectKind::NonGroveClone,
        ] {
            let node = WorkspaceNode::new("/code/x", kind).with_parent_project("/code/other");
            assert_eq!(node.grouping_key(), "/code/x", "{kind:?}");
        }
    }

    #[test]
    fn hierarchical_parent_priority() {
        let wt = WorkspaceNode::new("/code/app-wt", ProjectKind::RepositoryWorktree)
            .with_parent_project("/code/app")
            .with_ecosystem("/eco", "/eco");
        assert_eq!(wt.hierarchical_parent(), Some("/code/app"));

        let eco_wt = WorkspaceNode::new("/eco/.wt/feature", ProjectKind::EcosystemWorktree)
            .with_ecosystem("/eco", "/eco");
        assert_eq!(eco_wt.hierarchical_parent(), Some("/eco"));

        let repo = WorkspaceNode::new("/eco/lib", ProjectKind::Repository)
            .with_ecosystem("/eco", "/eco");
        assert_eq!(repo.hierarchical_parent(), None);
    }

    #[test]
    fn classification_predicates() {
        let eco_wt = WorkspaceNode::new("/eco/.wt/x", ProjectKind::EcosystemWorktree);
        assert!(eco_wt.is_worktree());
        assert!(eco_wt.is_ecosystem());
        let clone = WorkspaceNode::new("/src/clone", ProjectKind::NonGroveClone);
        assert!(!clone.is_worktree());
        assert!(!clone.is_ecosystem());
    }

    #[test]
    fn aliases_override_display_name() {
        let mut nodes = vec![
            WorkspaceNode::new("/code/app", ProjectKind::Repository),
            WorkspaceNode::new("/code/lib", ProjectKind::Repository),
        ];
        let aliases = BTreeMap::from([
            ("/code/app".to_string(), "frontend".to_string()),
            ("/code/lib".to_string(), "  ".to_string()),
        ]);
        apply_aliases(&mut nodes, &aliases);
        assert_eq!(nodes[0].name, "frontend");
        assert_eq!(nodes[1].name, "lib");
    }
}
