//! Multiplexer client.
//!
//! The controller never talks to tmux directly; the binary's effect executor
//! drives a [`Multiplexer`] on background threads. [`TmuxClient`] shells out
//! to the `tmux` CLI, and tests substitute an in-memory fake.

use std::path::Path;
use std::process::Command;

use crate::error::{Result, SessionizerError};

pub trait Multiplexer: Send + Sync {
    fn session_exists(&self, name: &str) -> bool;
    /// Names of every running session. No server means no sessions.
    fn list_sessions(&self) -> Vec<String>;
    fn launch(&self, name: &str, workdir: &str) -> Result<()>;
    fn switch_to(&self, name: &str) -> Result<()>;
    fn kill_session(&self, name: &str) -> Result<()>;
    fn capture_pane(&self, target: &str) -> Result<String>;
    fn current_session(&self) -> Option<String>;
    fn reload_config(&self, path: &Path) -> Result<()>;

    /// Creates the session if needed, then attaches or switches to it.
    fn open(&self, name: &str, workdir: &str) -> Result<()> {
        if !self.session_exists(name) {
            self.launch(name, workdir)?;
        }
        self.switch_to(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TmuxClient;

impl TmuxClient {
    /// Fails when the `tmux` binary cannot be executed at all.
    pub fn connect() -> Result<Self> {
        match Command::new("tmux").arg("-V").output() {
            Ok(output) if output.status.success() => Ok(Self),
            Ok(output) => Err(SessionizerError::TmuxUnavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Err(err) => Err(SessionizerError::TmuxUnavailable(err.to_string())),
        }
    }

    pub fn inside_tmux() -> bool {
        std::env::var_os("TMUX").is_some_and(|v| !v.is_empty())
    }
}

impl Multiplexer for TmuxClient {
    fn session_exists(&self, name: &str) -> bool {
        run_tmux(&["has-session", "-t", &exact_target(name)]).is_ok()
    }

    fn list_sessions(&self) -> Vec<String> {
        match run_tmux(&["list-sessions", "-F", "#{session_name}"]) {
            Ok(output) => parse_session_names(&output),
            Err(err) => {
                tracing::debug!(error = %err, "No tmux sessions listed");
                Vec::new()
            }
        }
    }

    fn launch(&self, name: &str, workdir: &str) -> Result<()> {
        run_tmux(&["new-session", "-d", "-s", name, "-c", workdir]).map(|_| ())
    }

    fn switch_to(&self, name: &str) -> Result<()> {
        let target = exact_target(name);
        if Self::inside_tmux() {
            run_tmux(&["switch-client", "-t", &target]).map(|_| ())
        } else {
            // attach-session needs the caller's terminal.
            let status = Command::new("tmux")
                .args(["attach-session", "-t", &target])
                .status()
                .map_err(|e| SessionizerError::TmuxUnavailable(e.to_string()))?;
            if status.success() {
                Ok(())
            } else {
                Err(SessionizerError::TmuxCommandFailed {
                    command: "attach-session".to_string(),
                    details: format!("exit status {:?}", status.code()),
                })
            }
        }
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        run_tmux(&["kill-session", "-t", &exact_target(name)]).map(|_| ())
    }

    fn capture_pane(&self, target: &str) -> Result<String> {
        run_tmux(&["capture-pane", "-p", "-t", &format!("{}:", exact_target(target))])
    }

    fn current_session(&self) -> Option<String> {
        if !Self::inside_tmux() {
            return None;
        }
        run_tmux(&["display-message", "-p", "#{session_name}"])
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn reload_config(&self, path: &Path) -> Result<()> {
        run_tmux(&["source-file", &path.to_string_lossy()]).map(|_| ())
    }
}

/// `=name` makes tmux match the session name exactly instead of by prefix.
fn exact_target(name: &str) -> String {
    format!("={}", name)
}

fn run_tmux(args: &[&str]) -> Result<String> {
    let output = Command::new("tmux")
        .args(args)
        .output()
        .map_err(|e| SessionizerError::TmuxUnavailable(e.to_string()))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(SessionizerError::TmuxCommandFailed {
            command: args.first().copied().unwrap_or_default().to_string(),
            details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

pub fn parse_session_names(output: &str) -> Vec<String> {
    let mut names: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Last non-empty line of captured pane text.
pub fn last_visible_line(captured: &str) -> Option<&str> {
    captured
        .lines()
        .map(str::trim_end)
        .rev()
        .find(|line| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_session_names_skips_blank_lines_and_dedupes() {
        let raw = "beta\n\nalpha\n  \nalpha\n";
        assert_eq!(parse_session_names(raw), vec!["alpha", "beta"]);
        assert!(parse_session_names("").is_empty());
    }

    #[test]
    fn last_visible_line_ignores_trailing_blank_rows() {
        let pane = "$ cargo test\nrunning 3 tests\ntest result: ok   \n\n   \n";
        assert_eq!(last_visible_line(pane), Some("test result: ok"));
        assert_eq!(last_visible_line("\n\n"), None);
    }

    #[test]
    fn exact_target_prefixes_equals() {
        assert_eq!(exact_target("code_app"), "=code_app");
    }
}
