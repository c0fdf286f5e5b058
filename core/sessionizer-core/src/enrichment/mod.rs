//! Enrichment pipeline: asynchronous probes that fill optional node attributes.
//!
//! The controller owns the node set. Before dispatching a refresh it calls
//! [`claim_targets`], which skips nodes whose previous probe of the same class
//! has not returned and marks the rest as loading. The probe runs on a
//! background thread against an immutable [`ProbeTarget`] snapshot and comes
//! back as exactly one [`EnrichmentUpdate`], which [`merge_update`] applies by
//! path. Results for paths that no longer exist are dropped.
//!
//! Probes never fail loudly: a probe that cannot determine a value reports
//! `None` for that path, which clears the attribute.

pub mod agent;
pub mod counters;
pub mod git;
pub mod pool;
pub mod rules;

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::process::{Command, Stdio};

use crate::config::ProbeCommands;
use crate::workspace::{
    AgentSession, GitStatus, NoteCounts, PlanStats, ProjectKind, RuleStatus, WorkspaceNode,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Classes and Per-Node Status
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentClass {
    Git,
    Agent,
    Notes,
    Plans,
    Rules,
}

impl EnrichmentClass {
    pub const ALL: [EnrichmentClass; 5] = [
        EnrichmentClass::Git,
        EnrichmentClass::Agent,
        EnrichmentClass::Notes,
        EnrichmentClass::Plans,
        EnrichmentClass::Rules,
    ];

    fn index(self) -> usize {
        match self {
            EnrichmentClass::Git => 0,
            EnrichmentClass::Agent => 1,
            EnrichmentClass::Notes => 2,
            EnrichmentClass::Plans => 3,
            EnrichmentClass::Rules => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EnrichmentClass::Git => "git",
            EnrichmentClass::Agent => "agent",
            EnrichmentClass::Notes => "notes",
            EnrichmentClass::Plans => "plans",
            EnrichmentClass::Rules => "rules",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unset,
    Loading,
    Done,
}

/// Per-node load state for each enrichment class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStatus {
    states: [LoadState; 5],
}

impl EnrichmentStatus {
    pub fn get(&self, class: EnrichmentClass) -> LoadState {
        self.states[class.index()]
    }

    pub fn set(&mut self, class: EnrichmentClass, state: LoadState) {
        self.states[class.index()] = state;
    }

    pub fn is_loading(&self, class: EnrichmentClass) -> bool {
        self.get(class) == LoadState::Loading
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Snapshots and Results
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable view of a node handed to a background probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub path: String,
    pub kind: ProjectKind,
    pub parent_project_path: Option<String>,
}

impl From<&WorkspaceNode> for ProbeTarget {
    fn from(node: &WorkspaceNode) -> Self {
        ProbeTarget {
            path: node.path.clone(),
            kind: node.kind,
            parent_project_path: node.parent_project_path.clone(),
        }
    }
}

/// One completed refresh of one attribute class, keyed by node path.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentUpdate {
    Git(HashMap<String, Option<GitStatus>>),
    Agent(HashMap<String, Option<AgentSession>>),
    Notes(HashMap<String, Option<NoteCounts>>),
    Plans(HashMap<String, Option<PlanStats>>),
    Rules(HashMap<String, Option<RuleStatus>>),
}

impl EnrichmentUpdate {
    pub fn class(&self) -> EnrichmentClass {
        match self {
            EnrichmentUpdate::Git(_) => EnrichmentClass::Git,
            EnrichmentUpdate::Agent(_) => EnrichmentClass::Agent,
            EnrichmentUpdate::Notes(_) => EnrichmentClass::Notes,
            EnrichmentUpdate::Plans(_) => EnrichmentClass::Plans,
            EnrichmentUpdate::Rules(_) => EnrichmentClass::Rules,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EnrichmentUpdate::Git(m) => m.len(),
            EnrichmentUpdate::Agent(m) => m.len(),
            EnrichmentUpdate::Notes(m) => m.len(),
            EnrichmentUpdate::Plans(m) => m.len(),
            EnrichmentUpdate::Rules(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Selects the nodes eligible for a refresh of `class` and marks them loading.
///
/// `only` restricts the selection to a set of paths (on-demand probing of
/// visible rows). Nodes with an in-flight probe of the same class are skipped.
pub fn claim_targets(
    nodes: &mut [WorkspaceNode],
    class: EnrichmentClass,
    only: Option<&HashSet<String>>,
) -> Vec<ProbeTarget> {
    let mut targets = Vec::new();
    for node in nodes.iter_mut() {
        if only.is_some_and(|paths| !paths.contains(&node.path)) {
            continue;
        }
        if node.enrichment.is_loading(class) {
            continue;
        }
        node.enrichment.set(class, LoadState::Loading);
        targets.push(ProbeTarget::from(&*node));
    }
    targets
}

/// Applies a probe result to the live node set. Returns how many nodes changed.
///
/// Each value fully replaces the prior attribute. Paths missing from `nodes`
/// belong to a node set that has since been replaced and are ignored.
pub fn merge_update(nodes: &mut [WorkspaceNode], update: EnrichmentUpdate) -> usize {
    let class = update.class();
    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.path.clone(), i))
        .collect();

    match update {
        EnrichmentUpdate::Git(values) => merge_slot(nodes, &index, class, values, |n| &mut n.git),
        EnrichmentUpdate::Agent(values) => {
            merge_slot(nodes, &index, class, values, |n| &mut n.agent)
        }
        EnrichmentUpdate::Notes(values) => {
            merge_slot(nodes, &index, class, values, |n| &mut n.notes)
        }
        EnrichmentUpdate::Plans(values) => {
            merge_slot(nodes, &index, class, values, |n| &mut n.plans)
        }
        EnrichmentUpdate::Rules(values) => {
            merge_slot(nodes, &index, class, values, |n| &mut n.rules)
        }
    }
}

fn merge_slot<T, F>(
    nodes: &mut [WorkspaceNode],
    index: &HashMap<String, usize>,
    class: EnrichmentClass,
    values: HashMap<String, Option<T>>,
    slot: F,
) -> usize
where
    F: Fn(&mut WorkspaceNode) -> &mut Option<T>,
{
    let mut merged = 0;
    for (path, value) in values {
        if let Some(&i) = index.get(&path) {
            let node = &mut nodes[i];
            *slot(node) = value;
            node.enrichment.set(class, LoadState::Done);
            merged += 1;
        }
    }
    merged
}

// ═══════════════════════════════════════════════════════════════════════════════
// Probers
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs one refresh of one class against a snapshot. Implementations block;
/// the caller runs them off the interaction thread.
pub trait Prober: Send + Sync {
    fn probe(&self, class: EnrichmentClass, targets: &[ProbeTarget]) -> EnrichmentUpdate;
}

/// Prober backed by `git` and the configured external tools.
#[derive(Debug, Clone)]
pub struct CommandProber {
    commands: ProbeCommands,
    concurrency: usize,
}

impl CommandProber {
    pub fn new(commands: ProbeCommands, concurrency: usize) -> Self {
        Self {
            commands,
            concurrency: concurrency.max(1),
        }
    }
}

impl Prober for CommandProber {
    fn probe(&self, class: EnrichmentClass, targets: &[ProbeTarget]) -> EnrichmentUpdate {
        match class {
            EnrichmentClass::Git => {
                let results = pool::run_bounded(targets, self.concurrency, |t| {
                    (t.path.clone(), git::probe(&t.path))
                });
                EnrichmentUpdate::Git(results.into_iter().collect())
            }
            EnrichmentClass::Rules => {
                let command = self.commands.rules.as_deref();
                let results = pool::run_bounded(targets, self.concurrency, |t| {
                    let status = command.and_then(|cmd| rules::probe(cmd, &t.path));
                    (t.path.clone(), status)
                });
                EnrichmentUpdate::Rules(results.into_iter().collect())
            }
            EnrichmentClass::Agent => {
                let records = self
                    .commands
                    .agent
                    .as_deref()
                    .and_then(agent::fetch)
                    .unwrap_or_default();
                EnrichmentUpdate::Agent(agent::match_sessions(&records, targets, Utc::now()))
            }
            EnrichmentClass::Notes => {
                let keyed = self
                    .commands
                    .notes
                    .as_deref()
                    .and_then(counters::fetch_keyed::<NoteCounts>)
                    .unwrap_or_default();
                EnrichmentUpdate::Notes(counters::lookup(&keyed, targets))
            }
            EnrichmentClass::Plans => {
                let keyed = self
                    .commands
                    .plans
                    .as_deref()
                    .and_then(counters::fetch_keyed::<PlanStats>)
                    .unwrap_or_default();
                EnrichmentUpdate::Plans(counters::lookup(&keyed, targets))
            }
        }
    }
}

/// Runs an external command and returns its stdout when it exits successfully.
pub(crate) fn run_capture(argv: &[String], cwd: Option<&str>) -> Option<String> {
    let (program, args) = argv.split_first()?;
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stderr(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    match command.output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).to_string())
        }
        Ok(output) => {
            tracing::debug!(program = %program, status = ?output.status.code(), "Probe command exited unsuccessfully");
            None
        }
        Err(err) => {
            tracing::debug!(program = %program, error = %err, "Probe command unavailable");
            None
        }
    }
}
