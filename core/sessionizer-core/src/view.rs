//! Filter/sort/group engine.
//!
//! [`compute_view`] turns the full node set plus the operator's view settings
//! into the ordered rows the picker renders. It holds no state: everything it
//! depends on is in [`ViewQuery`], so the controller can recompute after every
//! data change and re-match the cursor by path.
//!
//! Rows are built from two-level groups: a parent (any non-worktree node, or
//! a placeholder for a worktree whose source repository was not discovered)
//! followed by the worktrees attached to it through
//! [`WorkspaceNode::hierarchical_parent`]. When the focus is an ecosystem, the
//! ecosystem itself is emitted first as a header and the groups are its
//! direct children.
//!
//! Rows marked `context_only` are rendered for hierarchy only. They are never
//! cursor stops and never count for numeric jumps.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::paths::session_name;
use crate::workspace::{ProjectKind, WorkspaceNode};

/// Everything besides the node set that decides what is shown.
#[derive(Debug, Clone, Copy)]
pub struct ViewQuery<'a> {
    pub filter: &'a str,
    pub focus: Option<&'a str>,
    pub dirty_only: bool,
    pub fold_worktrees: bool,
    /// Names of running multiplexer sessions.
    pub running_sessions: &'a HashSet<String>,
    /// Home directory used to derive session names.
    pub home: Option<&'a Path>,
}

impl ViewQuery<'_> {
    fn is_running(&self, path: &str) -> bool {
        self.running_sessions.contains(&session_name(path, self.home))
    }
}

/// Match quality of a node against the filter text. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchQuality {
    None,
    Path,
    Substring,
    Prefix,
    Exact,
}

impl MatchQuality {
    pub fn is_match(self) -> bool {
        self != MatchQuality::None
    }
}

pub fn match_quality(node: &WorkspaceNode, filter: &str) -> MatchQuality {
    let needle = filter.trim().to_lowercase();
    if needle.is_empty() {
        return MatchQuality::None;
    }
    let name = node.name.to_lowercase();
    if name == needle {
        MatchQuality::Exact
    } else if name.starts_with(&needle) {
        MatchQuality::Prefix
    } else if name.contains(&needle) {
        MatchQuality::Substring
    } else if node.path.to_lowercase().contains(&needle) {
        MatchQuality::Path
    } else {
        MatchQuality::None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry {
    pub node: WorkspaceNode,
    /// Nesting level used for indentation.
    pub depth: usize,
    pub context_only: bool,
    /// True for a parent synthesized because it was not discovered.
    pub placeholder: bool,
}

impl ViewEntry {
    pub fn path(&self) -> &str {
        &self.node.path
    }

    pub fn is_selectable(&self) -> bool {
        !self.context_only
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectView {
    pub entries: Vec<ViewEntry>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Grouping
// ═══════════════════════════════════════════════════════════════════════════════

struct Group<'a> {
    parent: GroupParent<'a>,
    members: Vec<&'a WorkspaceNode>,
}

enum GroupParent<'a> {
    Node(&'a WorkspaceNode),
    Placeholder(WorkspaceNode),
}

impl GroupParent<'_> {
    fn node(&self) -> &WorkspaceNode {
        match self {
            GroupParent::Node(node) => node,
            GroupParent::Placeholder(node) => node,
        }
    }

    fn is_placeholder(&self) -> bool {
        matches!(self, GroupParent::Placeholder(_))
    }
}

/// The focused node, when a focus is set and still exists, and the groups
/// shown beneath it.
struct Scope<'a> {
    header: Option<&'a WorkspaceNode>,
    groups: Vec<Group<'a>>,
}

fn sort_key(node: &WorkspaceNode) -> (String, u8, &str) {
    let rank = if node.kind == ProjectKind::EcosystemWorktree {
        0
    } else {
        1
    };
    (node.name.to_lowercase(), rank, node.path.as_str())
}

fn build_scope<'a>(nodes: &'a [WorkspaceNode], focus: Option<&str>) -> Scope<'a> {
    let focused = focus.and_then(|f| nodes.iter().find(|n| n.path == f));

    let Some(focused) = focused else {
        let parents: Vec<&WorkspaceNode> = nodes.iter().filter(|n| !n.is_worktree()).collect();
        let worktrees: Vec<&WorkspaceNode> = nodes.iter().filter(|n| n.is_worktree()).collect();
        return Scope {
            header: None,
            groups: build_groups(parents, worktrees),
        };
    };

    if !focused.is_ecosystem() {
        let worktrees = nodes
            .iter()
            .filter(|n| n.hierarchical_parent() == Some(focused.path.as_str()))
            .collect();
        return Scope {
            header: None,
            groups: build_groups(vec![focused], worktrees),
        };
    }

    let focus_path = focused.path.as_str();
    let children: Vec<&WorkspaceNode> = nodes
        .iter()
        .filter(|n| n.path != focus_path)
        .filter(|n| {
            let in_ecosystem =
                !n.is_worktree() && n.parent_ecosystem_path.as_deref() == Some(focus_path);
            let ecosystem_worktree = n.kind == ProjectKind::EcosystemWorktree
                && n.hierarchical_parent() == Some(focus_path);
            in_ecosystem || ecosystem_worktree
        })
        .collect();
    let child_paths: HashSet<&str> = children.iter().copied().map(|n| n.path.as_str()).collect();
    let worktrees: Vec<&WorkspaceNode> = nodes
        .iter()
        .filter(|n| n.is_worktree() && !child_paths.contains(n.path.as_str()))
        .filter(|n| {
            n.hierarchical_parent()
                .is_some_and(|p| child_paths.contains(p))
                || n.parent_ecosystem_path.as_deref() == Some(focus_path)
        })
        .collect();

    Scope {
        header: Some(focused),
        groups: build_groups(children, worktrees),
    }
}

/// Attaches worktrees to their parents, synthesizing placeholder parents for
/// worktrees whose source was not discovered. Groups and members come back in
/// display order.
fn build_groups<'a>(
    mut parents: Vec<&'a WorkspaceNode>,
    worktrees: Vec<&'a WorkspaceNode>,
) -> Vec<Group<'a>> {
    let parent_paths: HashSet<&str> = parents.iter().copied().map(|n| n.path.as_str()).collect();
    let mut attached: HashMap<String, Vec<&'a WorkspaceNode>> = HashMap::new();
    let mut orphan_kinds: HashMap<String, ProjectKind> = HashMap::new();

    for worktree in worktrees {
        let Some(parent) = worktree.hierarchical_parent() else {
            // A worktree with no recorded source stands on its own.
            parents.push(worktree);
            continue;
        };
        if !parent_paths.contains(parent) {
            let kind = if worktree.kind == ProjectKind::EcosystemWorktree {
                ProjectKind::Ecosystem
            } else {
                ProjectKind::Repository
            };
            orphan_kinds.entry(parent.to_string()).or_insert(kind);
        }
        attached.entry(parent.to_string()).or_default().push(worktree);
    }

    let mut groups: Vec<Group<'a>> = parents
        .into_iter()
        .map(|node| Group {
            parent: GroupParent::Node(node),
            members: Vec::new(),
        })
        .collect();
    groups.extend(orphan_kinds.into_iter().map(|(path, kind)| Group {
        parent: GroupParent::Placeholder(WorkspaceNode::new(path, kind)),
        members: Vec::new(),
    }));

    for group in &mut groups {
        if let Some(mut members) = attached.remove(&group.parent.node().path) {
            members.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
            group.members = members;
        }
    }
    groups.sort_by(|a, b| sort_key(a.parent.node()).cmp(&sort_key(b.parent.node())));
    groups
}

// ═══════════════════════════════════════════════════════════════════════════════
// Views
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compute_view(nodes: &[WorkspaceNode], query: &ViewQuery) -> ProjectView {
    let scope = build_scope(nodes, query.focus);
    if query.filter.trim().is_empty() {
        default_view(scope, query)
    } else {
        filtered_view(scope, query)
    }
}

fn default_view(scope: Scope, query: &ViewQuery) -> ProjectView {
    let mut entries = Vec::new();
    let offset = usize::from(scope.header.is_some());
    let mut body = Vec::new();

    for group in &scope.groups {
        let members: Vec<&WorkspaceNode> = group
            .members
            .iter()
            .copied()
            .filter(|m| {
                if query.dirty_only {
                    m.is_dirty()
                } else {
                    !query.fold_worktrees || query.is_running(&m.path)
                }
            })
            .collect();

        let parent = group.parent.node();
        let parent_kept = if query.dirty_only {
            parent.is_dirty() && !group.parent.is_placeholder()
        } else {
            !group.parent.is_placeholder()
        };
        if !parent_kept && members.is_empty() {
            continue;
        }

        body.push(ViewEntry {
            node: parent.clone(),
            depth: offset,
            context_only: !parent_kept,
            placeholder: group.parent.is_placeholder(),
        });
        body.extend(members.into_iter().map(|m| ViewEntry {
            node: m.clone(),
            depth: offset + 1,
            context_only: false,
            placeholder: false,
        }));
    }

    if let Some(header) = scope.header {
        let header_kept = !query.dirty_only || header.is_dirty();
        if header_kept || !body.is_empty() {
            entries.push(ViewEntry {
                node: header.clone(),
                depth: 0,
                context_only: !header_kept,
                placeholder: false,
            });
        }
    }
    entries.extend(body);
    ProjectView { entries }
}

struct ScoredGroup {
    rows: Vec<ViewEntry>,
    best: MatchQuality,
    active: bool,
}

fn filtered_view(scope: Scope, query: &ViewQuery) -> ProjectView {
    let offset = usize::from(scope.header.is_some());
    let score = |node: &WorkspaceNode| -> MatchQuality {
        if query.dirty_only && !node.is_dirty() {
            return MatchQuality::None;
        }
        match_quality(node, query.filter)
    };

    let mut scored: Vec<ScoredGroup> = Vec::new();
    for group in &scope.groups {
        let parent = group.parent.node();
        let parent_score = if group.parent.is_placeholder() {
            MatchQuality::None
        } else {
            score(parent)
        };

        let mut members: Vec<(&WorkspaceNode, MatchQuality)> =
            group.members.iter().map(|m| (*m, score(m))).collect();
        if parent_score.is_match() {
            if query.dirty_only {
                members.retain(|(m, _)| m.is_dirty());
            }
        } else {
            members.retain(|(_, s)| s.is_match());
        }

        // Ecosystem worktrees carry their own grouping key. One whose session
        // state differs from its parent's is listed on its own so the running
        // partition stays contiguous.
        let active = query.is_running(parent.grouping_key());
        let (mut members, detached): (Vec<_>, Vec<_>) = members
            .into_iter()
            .partition(|(m, _)| query.is_running(m.grouping_key()) == active);
        for (member, member_score) in detached {
            scored.push(ScoredGroup {
                rows: vec![ViewEntry {
                    node: member.clone(),
                    depth: offset,
                    context_only: false,
                    placeholder: false,
                }],
                best: member_score,
                active: !active,
            });
        }

        if !parent_score.is_match() && members.is_empty() {
            continue;
        }
        // Stable: equal scores keep alphabetical order.
        members.sort_by(|a, b| b.1.cmp(&a.1));

        let best = members
            .iter()
            .map(|(_, s)| *s)
            .fold(parent_score, MatchQuality::max);

        let mut rows = vec![ViewEntry {
            node: parent.clone(),
            depth: offset,
            context_only: !parent_score.is_match(),
            placeholder: group.parent.is_placeholder(),
        }];
        rows.extend(members.into_iter().map(|(m, _)| ViewEntry {
            node: m.clone(),
            depth: offset + 1,
            context_only: false,
            placeholder: false,
        }));

        scored.push(ScoredGroup { rows, best, active });
    }

    scored.sort_by(|a, b| b.active.cmp(&a.active).then(b.best.cmp(&a.best)));

    let mut entries = Vec::new();
    if let Some(header) = scope.header {
        let header_matches = score(header).is_match();
        if header_matches || !scored.is_empty() {
            entries.push(ViewEntry {
                node: header.clone(),
                depth: 0,
                context_only: !header_matches,
                placeholder: false,
            });
        }
    }
    entries.extend(scored.into_iter().flat_map(|g| g.rows));
    ProjectView { entries }
}

/// Rows offered by the ecosystem picker: every ecosystem, each followed by
/// its ecosystem worktrees.
pub fn ecosystem_choices(nodes: &[WorkspaceNode]) -> ProjectView {
    let parents = nodes
        .iter()
        .filter(|n| n.kind == ProjectKind::Ecosystem)
        .collect();
    let worktrees = nodes
        .iter()
        .filter(|n| n.kind == ProjectKind::EcosystemWorktree)
        .collect();

    let mut entries = Vec::new();
    for group in build_groups(parents, worktrees) {
        let placeholder = group.parent.is_placeholder();
        entries.push(ViewEntry {
            node: group.parent.node().clone(),
            depth: 0,
            context_only: placeholder,
            placeholder,
        });
        entries.extend(group.members.into_iter().map(|m| ViewEntry {
            node: m.clone(),
            depth: 1,
            context_only: false,
            placeholder: false,
        }));
    }
    ProjectView { entries }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cursor Helpers
// ═══════════════════════════════════════════════════════════════════════════════

impl ProjectView {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ViewEntry> {
        self.entries.get(index)
    }

    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.path() == path)
    }

    pub fn is_selectable(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(ViewEntry::is_selectable)
    }

    pub fn first_selectable(&self) -> Option<usize> {
        self.entries.iter().position(ViewEntry::is_selectable)
    }

    pub fn last_selectable(&self) -> Option<usize> {
        self.entries.iter().rposition(ViewEntry::is_selectable)
    }

    /// Next selectable row strictly after (`forward`) or before `from`.
    /// `None` means the cursor must stay where it is.
    pub fn step(&self, from: usize, forward: bool) -> Option<usize> {
        if forward {
            (from + 1..self.entries.len()).find(|&i| self.is_selectable(i))
        } else {
            (0..from.min(self.entries.len())).rev().find(|&i| self.is_selectable(i))
        }
    }

    /// The `n`th selectable row, counting from 1.
    pub fn nth_selectable(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_selectable())
            .nth(n - 1)
            .map(|(i, _)| i)
    }

    /// Re-places a cursor after recomputation: the same path if it is still
    /// selectable, else the nearest selectable row to the old index,
    /// preferring rows below.
    pub fn reconcile(&self, path: Option<&str>, previous_index: usize) -> Option<usize> {
        if let Some(index) = path.and_then(|p| self.index_of(p)) {
            if self.is_selectable(index) {
                return Some(index);
            }
        }
        let anchor = previous_index.min(self.entries.len().saturating_sub(1));
        if self.is_selectable(anchor) {
            return Some(anchor);
        }
        self.step(anchor, true).or_else(|| self.step(anchor, false))
    }

    /// Paths of rows within the scroll window.
    pub fn window_paths(&self, offset: usize, height: usize) -> Vec<String> {
        self.entries
            .iter()
            .skip(offset)
            .take(height)
            .filter(|e| !e.placeholder)
            .map(|e| e.node.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::GitStatus;

    const HOME: &str = "/home/dev";

    fn repo(path: &str) -> WorkspaceNode {
        WorkspaceNode::new(path, ProjectKind::Repository)
    }

    fn worktree(path: &str, parent: &str) -> WorkspaceNode {
        WorkspaceNode::new(path, ProjectKind::RepositoryWorktree).with_parent_project(parent)
    }

    fn dirty(mut node: WorkspaceNode) -> WorkspaceNode {
        node.git = Some(GitStatus {
            modified: 1,
            dirty: true,
            ..GitStatus::default()
        });
        node
    }

    fn running(paths: &[&str]) -> HashSet<String> {
        paths
            .iter()
            .map(|p| session_name(p, Some(Path::new(HOME))))
            .collect()
    }

    fn query<'a>(sessions: &'a HashSet<String>) -> ViewQuery<'a> {
        ViewQuery {
            filter: "",
            focus: None,
            dirty_only: false,
            fold_worktrees: true,
            running_sessions: sessions,
            home: Some(Path::new(HOME)),
        }
    }

    fn paths(view: &ProjectView) -> Vec<&str> {
        view.entries.iter().map(|e| e.path()).collect()
    }

    #[test]
    fn default_view_hides_worktrees_without_running_sessions() {
        let nodes = vec![
            repo("/home/dev/B"),
            worktree("/home/dev/B/wt1", "/home/dev/B"),
            repo("/home/dev/A"),
            worktree("/home/dev/A/wt1", "/home/dev/A"),
        ];
        let sessions = running(&["/home/dev/B/wt1"]);
        let view = compute_view(&nodes, &query(&sessions));

        assert_eq!(
            paths(&view),
            vec!["/home/dev/A", "/home/dev/B", "/home/dev/B/wt1"]
        );
        assert_eq!(view.entries[2].depth, 1);
        assert!(view.entries.iter().all(ViewEntry::is_selectable));
    }

    #[test]
    fn unfolded_view_interleaves_every_worktree() {
        let nodes = vec![
            repo("/code/b"),
            worktree("/code/a/wt2", "/code/a"),
            repo("/code/a"),
            worktree("/code/a/wt1", "/code/a"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                fold_worktrees: false,
                ..query(&sessions)
            },
        );
        assert_eq!(
            paths(&view),
            vec!["/code/a", "/code/a/wt1", "/code/a/wt2", "/code/b"]
        );
    }

    #[test]
    fn parents_sort_case_insensitively_with_ecosystem_worktrees_first_on_ties() {
        let nodes = vec![
            repo("/x/Zeta"),
            repo("/x/alpha"),
            repo("/y/core"),
            WorkspaceNode::new("/z/core", ProjectKind::EcosystemWorktree),
        ];
        let sessions = HashSet::new();
        let view = compute_view(&nodes, &query(&sessions));
        assert_eq!(paths(&view), vec!["/x/alpha", "/z/core", "/y/core", "/x/Zeta"]);
    }

    #[test]
    fn focus_on_ecosystem_lists_children_and_their_worktrees() {
        let nodes = vec![
            WorkspaceNode::new("/E", ProjectKind::Ecosystem),
            repo("/E/y").with_ecosystem("/E", "/E"),
            repo("/E/x").with_ecosystem("/E", "/E"),
            worktree("/E/x/wt1", "/E/x").with_ecosystem("/E", "/E"),
            repo("/other"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                focus: Some("/E"),
                fold_worktrees: false,
                ..query(&sessions)
            },
        );
        assert_eq!(paths(&view), vec!["/E", "/E/x", "/E/x/wt1", "/E/y"]);
        let depths: Vec<usize> = view.entries.iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
    }

    #[test]
    fn focus_on_ecosystem_folds_nested_worktrees() {
        let nodes = vec![
            WorkspaceNode::new("/E", ProjectKind::Ecosystem),
            repo("/E/x").with_ecosystem("/E", "/E"),
            worktree("/E/x/wt1", "/E/x").with_ecosystem("/E", "/E"),
            WorkspaceNode::new("/E-wt/feat", ProjectKind::EcosystemWorktree)
                .with_parent_project("/E"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                focus: Some("/E"),
                ..query(&sessions)
            },
        );
        assert_eq!(paths(&view), vec!["/E", "/E-wt/feat", "/E/x"]);
    }

    #[test]
    fn focus_on_repository_shows_it_with_its_worktrees() {
        let nodes = vec![
            repo("/code/app"),
            worktree("/code/app-wt/a", "/code/app"),
            repo("/code/lib"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                focus: Some("/code/app"),
                fold_worktrees: false,
                ..query(&sessions)
            },
        );
        assert_eq!(paths(&view), vec!["/code/app", "/code/app-wt/a"]);
    }

    #[test]
    fn vanished_focus_shows_everything() {
        let nodes = vec![repo("/code/app"), repo("/code/lib")];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                focus: Some("/gone"),
                ..query(&sessions)
            },
        );
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn dirty_only_keeps_clean_ancestors_as_context() {
        let nodes = vec![
            repo("/code/app"),
            dirty(worktree("/code/app/wt", "/code/app")),
            dirty(repo("/code/lib")),
            repo("/code/clean"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                dirty_only: true,
                ..query(&sessions)
            },
        );
        assert_eq!(paths(&view), vec!["/code/app", "/code/app/wt", "/code/lib"]);
        assert!(view.entries[0].context_only);
        assert!(view.entries[1].is_selectable());
        assert!(view.entries[2].is_selectable());
    }

    #[test]
    fn orphan_worktree_gets_placeholder_parent() {
        let nodes = vec![worktree("/code/gone-wt/x", "/code/gone")];
        let sessions = running(&["/code/gone-wt/x"]);
        let view = compute_view(&nodes, &query(&sessions));

        assert_eq!(paths(&view), vec!["/code/gone", "/code/gone-wt/x"]);
        assert!(view.entries[0].placeholder);
        assert!(view.entries[0].context_only);
        assert_eq!(view.first_selectable(), Some(1));
    }

    #[test]
    fn match_quality_ranks_exact_prefix_substring_path() {
        let nodes = vec![
            repo("/src/foo-things/zzz"),
            repo("/src/barfoo"),
            repo("/src/foobar"),
            repo("/src/foo"),
            repo("/src/unrelated"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "foo",
                ..query(&sessions)
            },
        );
        assert_eq!(
            paths(&view),
            vec!["/src/foo", "/src/foobar", "/src/barfoo", "/src/foo-things/zzz"]
        );
    }

    #[test]
    fn match_quality_is_case_insensitive() {
        let node = repo("/src/FooBar");
        assert_eq!(match_quality(&node, "foobar"), MatchQuality::Exact);
        assert_eq!(match_quality(&node, "FOO"), MatchQuality::Prefix);
        assert_eq!(match_quality(&node, "src"), MatchQuality::Path);
        assert_eq!(match_quality(&node, "zzz"), MatchQuality::None);
    }

    #[test]
    fn filtered_view_puts_active_groups_first() {
        let nodes = vec![
            repo("/src/foo"),
            repo("/src/foobar"),
            repo("/src/barfoo"),
            worktree("/src/barfoo-wt/fix", "/src/barfoo"),
        ];
        let sessions = running(&["/src/barfoo"]);
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "foo",
                ..query(&sessions)
            },
        );

        assert_eq!(
            paths(&view),
            vec!["/src/barfoo", "/src/barfoo-wt/fix", "/src/foo", "/src/foobar"]
        );
        let is_active =
            |e: &ViewEntry| sessions.contains(&session_name(e.node.grouping_key(), Some(Path::new(HOME))));
        let active_end = view.entries.iter().rposition(is_active).unwrap();
        let inactive_start = view.entries.iter().position(|e| !is_active(e)).unwrap();
        assert!(active_end < inactive_start);
    }

    #[test]
    fn running_ecosystem_worktree_sorts_ahead_of_idle_matches() {
        let nodes = vec![
            WorkspaceNode::new("/home/dev/zeco", ProjectKind::Ecosystem),
            WorkspaceNode::new("/home/dev/zeco-wt/foo", ProjectKind::EcosystemWorktree)
                .with_parent_project("/home/dev/zeco"),
            repo("/home/dev/foo"),
        ];
        let sessions = running(&["/home/dev/zeco-wt/foo"]);
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "foo",
                ..query(&sessions)
            },
        );

        assert_eq!(paths(&view), vec!["/home/dev/zeco-wt/foo", "/home/dev/foo"]);
        let is_active =
            |e: &ViewEntry| sessions.contains(&session_name(e.node.grouping_key(), Some(Path::new(HOME))));
        let active_end = view.entries.iter().rposition(is_active).unwrap();
        let inactive_start = view.entries.iter().position(|e| !is_active(e)).unwrap();
        assert!(active_end < inactive_start);
    }

    #[test]
    fn idle_ecosystem_worktree_leaves_running_ecosystem_group() {
        let nodes = vec![
            WorkspaceNode::new("/home/dev/eco", ProjectKind::Ecosystem),
            WorkspaceNode::new("/home/dev/eco-wt/feature", ProjectKind::EcosystemWorktree)
                .with_parent_project("/home/dev/eco"),
            repo("/home/dev/economy"),
        ];
        let sessions = running(&["/home/dev/eco"]);
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "eco",
                ..query(&sessions)
            },
        );

        assert_eq!(
            paths(&view),
            vec!["/home/dev/eco", "/home/dev/economy", "/home/dev/eco-wt/feature"]
        );
        assert!(view.entries.iter().all(ViewEntry::is_selectable));
    }

    #[test]
    fn worktree_match_pulls_in_parent_as_context() {
        let nodes = vec![
            repo("/code/app"),
            worktree("/code/app-wt/login-fix", "/code/app"),
            worktree("/code/app-wt/other", "/code/app"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "login",
                ..query(&sessions)
            },
        );
        assert_eq!(paths(&view), vec!["/code/app", "/code/app-wt/login-fix"]);
        assert!(view.entries[0].context_only);
        assert_eq!(view.first_selectable(), Some(1));
    }

    #[test]
    fn parent_match_includes_all_worktrees_even_when_folded() {
        let nodes = vec![
            repo("/code/app"),
            worktree("/code/app-wt/a", "/code/app"),
            worktree("/code/app-wt/b", "/code/app"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "app",
                ..query(&sessions)
            },
        );
        assert_eq!(view.len(), 3);
        assert!(view.entries.iter().all(ViewEntry::is_selectable));
    }

    #[test]
    fn focused_filter_marks_non_matching_header_as_context() {
        let nodes = vec![
            WorkspaceNode::new("/E", ProjectKind::Ecosystem),
            repo("/E/api").with_ecosystem("/E", "/E"),
            repo("/E/web").with_ecosystem("/E", "/E"),
            repo("/apiary"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "api",
                focus: Some("/E"),
                ..query(&sessions)
            },
        );
        assert_eq!(paths(&view), vec!["/E", "/E/api"]);
        assert!(view.entries[0].context_only);
        assert!(view.entries[1].is_selectable());
    }

    #[test]
    fn cursor_steps_skip_context_rows() {
        let nodes = vec![
            repo("/code/a"),
            worktree("/code/a-wt/x", "/code/a"),
            repo("/code/b"),
            worktree("/code/b-wt/x", "/code/b"),
        ];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "-wt",
                ..query(&sessions)
            },
        );
        // a (context), a-wt/x, b (context), b-wt/x
        assert_eq!(view.step(1, true), Some(3));
        assert_eq!(view.step(3, false), Some(1));
        assert_eq!(view.step(1, false), None);
        assert_eq!(view.step(3, true), None);
        assert_eq!(view.nth_selectable(2), Some(3));
        assert_eq!(view.nth_selectable(3), None);
    }

    #[test]
    fn reconcile_never_lands_on_context_rows() {
        let nodes = vec![repo("/code/a"), worktree("/code/a-wt/x", "/code/a")];
        let sessions = HashSet::new();
        let view = compute_view(
            &nodes,
            &ViewQuery {
                filter: "-wt",
                ..query(&sessions)
            },
        );
        assert_eq!(view.reconcile(Some("/code/a"), 0), Some(1));
        assert_eq!(view.reconcile(Some("/gone"), 7), Some(1));
        assert_eq!(view.reconcile(Some("/code/a-wt/x"), 0), Some(1));

        let empty = ProjectView::default();
        assert_eq!(empty.reconcile(None, 0), None);
    }

    #[test]
    fn ecosystem_choices_nest_worktrees() {
        let nodes = vec![
            WorkspaceNode::new("/eco", ProjectKind::Ecosystem),
            WorkspaceNode::new("/eco-wt/f", ProjectKind::EcosystemWorktree)
                .with_parent_project("/eco"),
            repo("/eco/lib"),
        ];
        let picker = ecosystem_choices(&nodes);
        assert_eq!(paths(&picker), vec!["/eco", "/eco-wt/f"]);
        assert_eq!(picker.entries[1].depth, 1);
    }
}
