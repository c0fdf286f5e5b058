//! Agent session probe.
//!
//! A single external call lists every known agent session with its working
//! directory. Sessions are attached to the most specific project containing
//! that directory, then a worktree's match is lifted onto its source
//! repository when the repository has none of its own.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::paths::{canonicalize_path, is_same_or_descendant};
use crate::workspace::{AgentSession, AgentState, ProjectKind};

use super::{run_capture, ProbeTarget};

/// One row of the agent tool's JSON listing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub working_directory: String,
    pub status: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

pub fn fetch(command: &[String]) -> Option<Vec<AgentRecord>> {
    let output = run_capture(command, None)?;
    parse_records(&output)
}

pub fn parse_records(output: &str) -> Option<Vec<AgentRecord>> {
    if output.trim().is_empty() {
        return Some(Vec::new());
    }
    match serde_json::from_str::<Vec<AgentRecord>>(output) {
        Ok(records) => Some(records),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse agent session listing");
            None
        }
    }
}

fn parse_state(raw: &str) -> Option<AgentState> {
    match raw.trim().to_lowercase().as_str() {
        "running" | "active" | "working" => Some(AgentState::Running),
        "idle" | "waiting" | "ready" => Some(AgentState::Idle),
        "completed" | "done" | "finished" => Some(AgentState::Completed),
        "failed" | "error" | "errored" => Some(AgentState::Failed),
        _ => None,
    }
}

/// Maps agent sessions onto probe targets. Every target appears in the
/// result, with `None` when no session matched it.
pub fn match_sessions(
    records: &[AgentRecord],
    targets: &[ProbeTarget],
    now: DateTime<Utc>,
) -> HashMap<String, Option<AgentSession>> {
    let mut matched: HashMap<String, AgentSession> = HashMap::new();

    for record in records {
        let Some(state) = parse_state(&record.status) else {
            continue;
        };
        let working_directory = canonicalize_path(&record.working_directory);

        let owner = targets
            .iter()
            .filter(|t| is_same_or_descendant(&t.path, &working_directory))
            .max_by_key(|t| t.path.len());
        let Some(owner) = owner else {
            continue;
        };

        let duration_secs = record
            .started_at
            .map(|start| {
                let end = record.ended_at.unwrap_or(now);
                end.signed_duration_since(start).num_seconds().max(0) as u64
            })
            .unwrap_or(0);
        let session = AgentSession {
            state,
            duration_secs,
            working_directory,
        };

        let replace = matched
            .get(&owner.path)
            .map_or(true, |existing| session.state.priority() > existing.state.priority());
        if replace {
            matched.insert(owner.path.clone(), session);
        }
    }

    // Lift worktree matches onto their source repository.
    let own: HashSet<String> = matched.keys().cloned().collect();
    for target in targets {
        if target.kind != ProjectKind::RepositoryWorktree {
            continue;
        }
        let Some(parent) = target.parent_project_path.as_deref() else {
            continue;
        };
        if own.contains(parent) || !targets.iter().any(|t| t.path == parent) {
            continue;
        }
        let Some(session) = matched.get(&target.path).cloned() else {
            continue;
        };
        let replace = matched
            .get(parent)
            .map_or(true, |lifted| session.state.priority() > lifted.state.priority());
        if replace {
            matched.insert(parent.to_string(), session);
        }
    }

    targets
        .iter()
        .map(|t| (t.path.clone(), matched.get(&t.path).cloned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str, kind: ProjectKind, parent: Option<&str>) -> ProbeTarget {
        ProbeTarget {
            path: path.to_string(),
            kind,
            parent_project_path: parent.map(str::to_string),
        }
    }

    fn record(dir: &str, status: &str) -> AgentRecord {
        AgentRecord {
            working_directory: dir.to_string(),
            status: status.to_string(),
            started_at: None,
            ended_at: None,
        }
    }

    #[test]
    fn parses_listing_and_tolerates_missing_fields() {
        let raw = r#"[
            {"working_directory": "/nx/app", "status": "running", "started_at": "2026-01-01T10:00:00Z"},
            {"working_directory": "/nx/lib", "status": "idle"}
        ]"#;
        let records = parse_records(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].started_at.is_none());
        assert!(parse_records("not json").is_none());
        assert_eq!(parse_records("  ").unwrap().len(), 0);
    }

    #[test]
    fn matches_most_specific_project() {
        let targets = vec![
            target("/nx/app", ProjectKind::Repository, None),
            target("/nx/app/packages/ui", ProjectKind::Repository, None),
        ];
        let records = vec![record("/nx/app/packages/ui/src", "running")];
        let result = match_sessions(&records, &targets, Utc::now());
        assert!(result["/nx/app"].is_none());
        assert_eq!(
            result["/nx/app/packages/ui"].as_ref().map(|s| s.state),
            Some(AgentState::Running)
        );
    }

    #[test]
    fn worktree_match_propagates_to_parent() {
        let targets = vec![
            target("/nx/app", ProjectKind::Repository, None),
            target(
                "/nx/app-wt/fix",
                ProjectKind::RepositoryWorktree,
                Some("/nx/app"),
            ),
        ];
        let records = vec![record("/nx/app-wt/fix", "idle")];
        let result = match_sessions(&records, &targets, Utc::now());
        let parent = result["/nx/app"].as_ref().unwrap();
        assert_eq!(parent.state, AgentState::Idle);
        assert_eq!(parent.working_directory, "/nx/app-wt/fix");
        assert!(result["/nx/app-wt/fix"].is_some());
    }

    #[test]
    fn parent_own_session_is_not_overwritten_by_worktree() {
        let targets = vec![
            target("/nx/app", ProjectKind::Repository, None),
            target(
                "/nx/app-wt/fix",
                ProjectKind::RepositoryWorktree,
                Some("/nx/app"),
            ),
        ];
        let records = vec![
            record("/nx/app", "completed"),
            record("/nx/app-wt/fix", "running"),
        ];
        let result = match_sessions(&records, &targets, Utc::now());
        assert_eq!(
            result["/nx/app"].as_ref().map(|s| s.state),
            Some(AgentState::Completed)
        );
    }

    #[test]
    fn higher_priority_state_wins_and_duration_is_computed() {
        let now: DateTime<Utc> = "2026-01-01T10:10:00Z".parse().unwrap();
        let targets = vec![target("/nx/app", ProjectKind::Repository, None)];
        let mut done = record("/nx/app", "completed");
        done.started_at = Some("2026-01-01T09:00:00Z".parse().unwrap());
        done.ended_at = Some("2026-01-01T09:30:00Z".parse().unwrap());
        let mut live = record("/nx/app", "running");
        live.started_at = Some("2026-01-01T10:00:00Z".parse().unwrap());

        let result = match_sessions(&[done, live], &targets, now);
        let session = result["/nx/app"].as_ref().unwrap();
        assert_eq!(session.state, AgentState::Running);
        assert_eq!(session.duration_secs, 600);
    }

    #[test]
    fn unknown_status_and_unrelated_dirs_are_ignored() {
        let targets = vec![target("/nx/app", ProjectKind::Repository, None)];
        let records = vec![record("/nx/app", "mystery"), record("/elsewhere", "running")];
        let result = match_sessions(&records, &targets, Utc::now());
        assert_eq!(result.len(), 1);
        assert!(result["/nx/app"].is_none());
    }
}
