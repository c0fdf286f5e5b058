//! Binding artifact: the tmux configuration fragment generated from the
//! key-binding store.
//!
//! The file is machine-owned. It is regenerated wholesale after every binding
//! mutation and sourced by the live tmux server; the operator's own
//! `tmux.conf` only needs a single `source-file` line pointing at it.

use std::path::Path;

use crate::config::SessionizerConfig;
use crate::error::{Result, SessionizerError};
use crate::keybindings::KeyBindingStore;
use crate::storage::write_atomic;

const HEADER: &str = "# Generated by sessionizer. Do not edit: this file is rewritten whenever hotkeys change.";

/// How bound keys are installed into tmux.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    pub key_table: String,
    /// Shell command template; `{path}` is replaced by the project path,
    /// escaped for use inside single quotes.
    pub switch_command: String,
}

impl From<&SessionizerConfig> for ArtifactSettings {
    fn from(config: &SessionizerConfig) -> Self {
        Self {
            key_table: config.key_table.clone(),
            switch_command: config.switch_command.clone(),
        }
    }
}

pub fn render(store: &KeyBindingStore, settings: &ArtifactSettings) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for binding in store.bindings() {
        let Some(path) = binding.path.as_deref() else {
            continue;
        };
        let command = settings
            .switch_command
            .replace("{path}", &path.replace('\'', r"'\''"));
        out.push_str(&format!(
            "bind-key -T {} {} run-shell \"{}\"\n",
            settings.key_table,
            tmux_key(binding.hotkey),
            escape_double_quoted(&command)
        ));
    }
    out
}

/// Renders the artifact and replaces `path` atomically.
pub fn write(path: &Path, store: &KeyBindingStore, settings: &ArtifactSettings) -> Result<()> {
    let content = render(store, settings);
    write_atomic(path, content.as_bytes())
        .map_err(|e| SessionizerError::io("writing binding artifact", e))
}

fn tmux_key(hotkey: char) -> String {
    match hotkey {
        '\'' => "\"'\"".to_string(),
        ';' | '"' | '#' | '{' | '}' | '$' | '~' | '\\' => format!("'{}'", hotkey),
        _ => hotkey.to_string(),
    }
}

fn escape_double_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '"' | '\\' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn settings() -> ArtifactSettings {
        ArtifactSettings {
            key_table: "prefix".to_string(),
            switch_command: "sessionizer '{path}'".to_string(),
        }
    }

    fn store() -> KeyBindingStore {
        let bindings = BTreeMap::from([
            ("a".to_string(), "/code/app".to_string()),
            ("d".to_string(), "/code/it's".to_string()),
        ]);
        KeyBindingStore::new(&['a', 's', 'd'], &bindings)
    }

    #[test]
    fn renders_one_line_per_bound_hotkey() {
        let out = render(&store(), &settings());
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("# Generated by sessionizer"));
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "bind-key -T prefix a run-shell \"sessionizer '/code/app'\""
        );
        assert!(!out.contains(" s run-shell"));
    }

    #[test]
    fn quotes_are_escaped_for_shell_and_tmux() {
        let out = render(&store(), &settings());
        assert!(out.contains(r#"sessionizer '/code/it'\\''s'"#), "{out}");
    }

    #[test]
    fn special_hotkeys_are_quoted() {
        assert_eq!(tmux_key(';'), "';'");
        assert_eq!(tmux_key('\''), "\"'\"");
        assert_eq!(tmux_key('x'), "x");
    }

    #[test]
    fn write_replaces_file_wholesale() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("tmux-bindings.conf");
        std::fs::write(&path, "hand edits\n").unwrap();

        write(&path, &store(), &settings()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hand edits"));
        assert!(content.contains("bind-key -T prefix a"));
    }
}
