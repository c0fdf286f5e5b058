//! Git status probe.
//!
//! One `git status --porcelain=v2 --branch` call supplies branch, ahead/behind
//! and file counts. Two `git diff --numstat` sub-probes (unstaged and staged)
//! supply the line delta. Anything that is not a readable repository yields
//! `None`.

use crate::workspace::GitStatus;

use super::run_capture;

pub fn probe(path: &str) -> Option<GitStatus> {
    let status_output = run_git(path, &["status", "--porcelain=v2", "--branch"])?;
    let mut status = parse_porcelain_v2(&status_output);

    let (unstaged_added, unstaged_deleted) = run_git(path, &["diff", "--numstat"])
        .map(|out| parse_numstat(&out))
        .unwrap_or_default();
    let (staged_added, staged_deleted) = run_git(path, &["diff", "--cached", "--numstat"])
        .map(|out| parse_numstat(&out))
        .unwrap_or_default();

    status.lines_added = unstaged_added.saturating_add(staged_added);
    status.lines_deleted = unstaged_deleted.saturating_add(staged_deleted);
    Some(status)
}

fn run_git(path: &str, args: &[&str]) -> Option<String> {
    let mut argv = vec!["git".to_string(), "-C".to_string(), path.to_string()];
    argv.extend(args.iter().map(|a| a.to_string()));
    run_capture(&argv, None)
}

pub fn parse_porcelain_v2(output: &str) -> GitStatus {
    let mut status = GitStatus::default();

    for line in output.lines() {
        if let Some(head) = line.strip_prefix("# branch.head ") {
            if head != "(detached)" {
                status.branch = Some(head.trim().to_string());
            }
        } else if let Some(ab) = line.strip_prefix("# branch.ab ") {
            let mut parts = ab.split_whitespace();
            status.ahead = parts
                .next()
                .and_then(|a| a.trim_start_matches('+').parse().ok())
                .unwrap_or(0);
            status.behind = parts
                .next()
                .and_then(|b| b.trim_start_matches('-').parse().ok())
                .unwrap_or(0);
        } else if line.starts_with("1 ") || line.starts_with("2 ") {
            let mut xy = line[2..].chars();
            let index = xy.next().unwrap_or('.');
            let worktree = xy.next().unwrap_or('.');
            if index != '.' {
                status.staged += 1;
            }
            if worktree != '.' {
                status.modified += 1;
            }
        } else if line.starts_with("u ") {
            status.modified += 1;
        } else if line.starts_with("? ") {
            status.untracked += 1;
        }
    }

    status.dirty = status.staged + status.modified + status.untracked > 0;
    status
}

/// Sums `added<TAB>deleted<TAB>path` lines. Binary files (`-`) count as zero.
pub fn parse_numstat(output: &str) -> (u32, u32) {
    output.lines().fold((0u32, 0u32), |(added, deleted), line| {
        let mut parts = line.split('\t');
        let a = parts.next().and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
        let d = parts.next().and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
        (added.saturating_add(a), deleted.saturating_add(d))
    })
}
