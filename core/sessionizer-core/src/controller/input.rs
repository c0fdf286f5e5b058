//! Keystroke handling, one function per mode. A mode consumes every key
//! while it is active.

use super::{Controller, Effect, Mode};
use crate::view::ecosystem_choices;

/// Terminal-independent key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Home,
    End,
    /// Ctrl-C: leave immediately from any mode.
    Interrupt,
}

impl Controller {
    pub(super) fn handle_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        if key == Key::Interrupt {
            self.quit(effects);
            return;
        }
        match &self.mode {
            Mode::Normal => self.normal_key(key, effects),
            Mode::Filtering => self.filtering_key(key, effects),
            Mode::EditingHotkey { path, highlighted } => {
                let (path, highlighted) = (path.clone(), *highlighted);
                self.hotkey_key(key, path, highlighted, effects)
            }
            Mode::EcosystemPicker { cursor } => {
                let cursor = *cursor;
                self.picker_key(key, cursor, effects)
            }
            Mode::Renaming { .. } => self.renaming_key(key, effects),
        }
    }

    fn step_cursor(&mut self, forward: bool, effects: &mut Vec<Effect>) {
        let next = if self.view.is_selectable(self.cursor) {
            self.view.step(self.cursor, forward)
        } else if forward {
            self.view.first_selectable()
        } else {
            self.view.last_selectable()
        };
        if let Some(index) = next {
            self.move_cursor_to(index, effects);
        }
    }

    fn normal_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        match key {
            Key::Char('j') | Key::Down => self.step_cursor(true, effects),
            Key::Char('k') | Key::Up => self.step_cursor(false, effects),
            Key::Char('g') | Key::Home => {
                if let Some(index) = self.view.first_selectable() {
                    self.move_cursor_to(index, effects);
                }
            }
            Key::Char('G') | Key::End => {
                if let Some(index) = self.view.last_selectable() {
                    self.move_cursor_to(index, effects);
                }
            }
            Key::Char(c @ '1'..='9') => {
                let n = c.to_digit(10).unwrap_or(0) as usize;
                if let Some(index) = self.view.nth_selectable(n) {
                    self.move_cursor_to(index, effects);
                }
            }
            Key::Enter => self.open_selected(effects),
            Key::Char('/') => self.mode = Mode::Filtering,
            Key::Char('e') => {
                let Some(path) = self.selected().map(|e| e.path().to_string()) else {
                    return;
                };
                if self.bindings.bindings().is_empty() {
                    self.set_status("No hotkey alphabet configured".to_string());
                    return;
                }
                let highlighted = self
                    .bindings
                    .hotkey_for(&path)
                    .and_then(|k| self.bindings.alphabet().iter().position(|&c| c == k))
                    .unwrap_or(0);
                self.mode = Mode::EditingHotkey { path, highlighted };
            }
            Key::Char('f') => {
                self.picker = ecosystem_choices(&self.nodes);
                if self.picker.is_empty() {
                    self.set_status("No ecosystems discovered".to_string());
                    return;
                }
                let cursor = self
                    .config
                    .focus
                    .as_deref()
                    .and_then(|f| self.picker.index_of(f))
                    .or_else(|| self.picker.first_selectable())
                    .unwrap_or(0);
                self.mode = Mode::EcosystemPicker { cursor };
            }
            Key::Char('F') => {
                if self.config.focus.take().is_some() {
                    self.recompute();
                    effects.push(Effect::SaveConfig(self.config.clone()));
                }
            }
            Key::Char('d') => {
                self.dirty_only = !self.dirty_only;
                self.recompute();
            }
            Key::Char('w') => {
                self.config.fold_worktrees = !self.config.fold_worktrees;
                self.recompute();
                effects.push(Effect::SaveConfig(self.config.clone()));
            }
            Key::Char('t') => {
                self.config.path_display = self.config.path_display.next();
                effects.push(Effect::SaveConfig(self.config.clone()));
            }
            Key::Char('r') => {
                if let Some(entry) = self.selected() {
                    self.mode = Mode::Renaming {
                        path: entry.path().to_string(),
                        buffer: entry.node.name.clone(),
                    };
                }
            }
            Key::Char('R') => {
                self.start_discovery(effects);
                self.set_status("Rescanning projects".to_string());
            }
            Key::Char('x') => {
                let Some(path) = self.selected().map(|e| e.path().to_string()) else {
                    return;
                };
                if self.is_running(&path) {
                    effects.push(Effect::KillSession {
                        name: self.session_for(&path),
                    });
                } else {
                    self.set_status("No running session for this project".to_string());
                }
            }
            Key::Char('p') => {
                let Some(path) = self.selected().map(|e| e.path().to_string()) else {
                    return;
                };
                if self.is_running(&path) {
                    effects.push(Effect::CapturePane {
                        name: self.session_for(&path),
                    });
                } else {
                    self.set_status("No running session for this project".to_string());
                }
            }
            Key::Esc if !self.filter.is_empty() => {
                self.filter.clear();
                self.recompute();
            }
            Key::Char('q') | Key::Esc => self.quit(effects),
            _ => {}
        }
    }

    fn filtering_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        match key {
            Key::Char(c) => {
                self.filter.push(c);
                self.recompute();
                self.probe_visible(effects);
            }
            Key::Backspace => {
                self.filter.pop();
                self.recompute();
            }
            Key::Up => self.step_cursor(false, effects),
            Key::Down => self.step_cursor(true, effects),
            Key::Enter => self.open_selected(effects),
            Key::Esc => {
                self.filter.clear();
                self.mode = Mode::Normal;
                self.recompute();
            }
            Key::Tab => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn hotkey_key(&mut self, key: Key, path: String, highlighted: usize, effects: &mut Vec<Effect>) {
        let count = self.bindings.bindings().len();

        match key {
            Key::Up => {
                self.mode = Mode::EditingHotkey {
                    path,
                    highlighted: highlighted.checked_sub(1).unwrap_or(count.saturating_sub(1)),
                };
            }
            Key::Down => {
                self.mode = Mode::EditingHotkey {
                    path,
                    highlighted: (highlighted + 1) % count.max(1),
                };
            }
            Key::Enter => {
                if let Some(hotkey) = self.bindings.alphabet().get(highlighted).copied() {
                    self.assign_hotkey(hotkey, &path, effects);
                }
            }
            Key::Char(c) => self.assign_hotkey(c, &path, effects),
            Key::Backspace | Key::Delete => {
                self.mode = Mode::Normal;
                match self.bindings.hotkey_for(&path) {
                    Some(hotkey) => {
                        self.bindings.clear(hotkey);
                        self.set_status(format!("Cleared hotkey {}", hotkey));
                        self.commit_bindings(effects);
                    }
                    None => self.set_status("Project had no hotkey".to_string()),
                }
            }
            Key::Esc => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn assign_hotkey(&mut self, hotkey: char, path: &str, effects: &mut Vec<Effect>) {
        match self.bindings.assign(hotkey, path) {
            Ok(change) => {
                self.mode = Mode::Normal;
                let name = crate::paths::base_name(path);
                let text = match change.displaced {
                    Some(previous) => format!(
                        "{} → {} (was {})",
                        hotkey,
                        name,
                        crate::paths::base_name(&previous)
                    ),
                    None => format!("{} → {}", hotkey, name),
                };
                self.set_status(text);
                self.commit_bindings(effects);
            }
            // Rejected: stay in the mode so the operator can pick again.
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn commit_bindings(&mut self, effects: &mut Vec<Effect>) {
        self.config.bindings = self.bindings.to_map();
        effects.push(Effect::ApplyBindings(self.config.clone()));
    }

    fn picker_key(&mut self, key: Key, cursor: usize, effects: &mut Vec<Effect>) {
        match key {
            Key::Char('j') | Key::Down => {
                if let Some(next) = self.picker.step(cursor, true) {
                    self.mode = Mode::EcosystemPicker { cursor: next };
                }
            }
            Key::Char('k') | Key::Up => {
                if let Some(next) = self.picker.step(cursor, false) {
                    self.mode = Mode::EcosystemPicker { cursor: next };
                }
            }
            Key::Enter => {
                let Some(entry) = self.picker.get(cursor).filter(|e| e.is_selectable()) else {
                    return;
                };
                let focus = entry.path().to_string();
                let name = entry.node.name.clone();
                self.set_status(format!("Focused {}", name));
                self.config.focus = Some(focus);
                self.mode = Mode::Normal;
                self.recompute();
                effects.push(Effect::SaveConfig(self.config.clone()));
            }
            Key::Esc | Key::Char('q') => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn renaming_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        let Mode::Renaming { path, buffer } = &mut self.mode else {
            return;
        };
        match key {
            Key::Char(c) => buffer.push(c),
            Key::Backspace => {
                buffer.pop();
            }
            Key::Enter => {
                let alias = buffer.trim().to_string();
                let path = std::mem::take(path);
                self.mode = Mode::Normal;
                let alias = (!alias.is_empty() && alias != crate::paths::base_name(&path))
                    .then_some(alias);
                self.set_alias(&path, alias);
                effects.push(Effect::SaveConfig(self.config.clone()));
            }
            Key::Esc => self.mode = Mode::Normal,
            _ => {}
        }
    }
}
