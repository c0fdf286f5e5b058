//! Key-binding store: single-character hotkeys mapped to project paths.
//!
//! The alphabet is configuration; every hotkey in it always has a slot, and a
//! slot with no path is "available". A project holds at most one hotkey and a
//! hotkey points at most at one project. Every mutation is a single swap over
//! the slot table, so no intermediate state breaks either rule.

use std::collections::BTreeMap;

use crate::config::SessionizerConfig;
use crate::error::{Result, SessionizerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub hotkey: char,
    pub path: Option<String>,
}

impl KeyBinding {
    pub fn is_available(&self) -> bool {
        self.path.is_none()
    }
}

/// What a successful assignment changed, for status messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reassignment {
    /// Project that lost `hotkey` to the new owner.
    pub displaced: Option<String>,
    /// Hotkey the new owner held before and which is now available.
    pub released: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindingStore {
    slots: Vec<KeyBinding>,
}

impl KeyBindingStore {
    /// Builds the store from the alphabet and the persisted map. Persisted
    /// entries for hotkeys outside the alphabet are dropped; if two hotkeys
    /// name the same project, the first in alphabet order keeps it.
    pub fn new(alphabet: &[char], persisted: &BTreeMap<String, String>) -> Self {
        let mut slots: Vec<KeyBinding> = alphabet
            .iter()
            .map(|&hotkey| KeyBinding { hotkey, path: None })
            .collect();

        for slot in &mut slots {
            let Some(path) = persisted
                .get(&slot.hotkey.to_string())
                .filter(|p| !p.trim().is_empty())
            else {
                continue;
            };
            slot.path = Some(path.clone());
        }

        let mut seen: Vec<String> = Vec::new();
        for slot in &mut slots {
            if let Some(path) = &slot.path {
                if seen.contains(path) {
                    tracing::warn!(hotkey = %slot.hotkey, path = %path, "Dropping duplicate hotkey binding");
                    slot.path = None;
                } else {
                    seen.push(path.clone());
                }
            }
        }

        Self { slots }
    }

    pub fn from_config(config: &SessionizerConfig) -> Self {
        Self::new(&config.hotkeys(), &config.bindings)
    }

    /// The persisted form: only bound hotkeys appear.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.slots
            .iter()
            .filter_map(|s| s.path.as_ref().map(|p| (s.hotkey.to_string(), p.clone())))
            .collect()
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.slots
    }

    pub fn alphabet(&self) -> Vec<char> {
        self.slots.iter().map(|s| s.hotkey).collect()
    }

    pub fn contains(&self, hotkey: char) -> bool {
        self.slots.iter().any(|s| s.hotkey == hotkey)
    }

    pub fn hotkey_for(&self, path: &str) -> Option<char> {
        self.slots
            .iter()
            .find(|s| s.path.as_deref() == Some(path))
            .map(|s| s.hotkey)
    }

    /// Binds `hotkey` to `path`, freeing whatever either side held before.
    pub fn assign(&mut self, hotkey: char, path: &str) -> Result<Reassignment> {
        let target = self
            .slots
            .iter()
            .position(|s| s.hotkey == hotkey)
            .ok_or_else(|| SessionizerError::HotkeyNotInAlphabet {
                hotkey,
                alphabet: self.slots.iter().map(|s| s.hotkey).collect(),
            })?;

        let previous = self
            .slots
            .iter()
            .position(|s| s.path.as_deref() == Some(path));

        let mut change = Reassignment::default();
        if previous == Some(target) {
            return Ok(change);
        }

        let mut next = self.slots.clone();
        if let Some(i) = previous {
            change.released = Some(next[i].hotkey);
            next[i].path = None;
        }
        change.displaced = next[target].path.replace(path.to_string());
        self.slots = next;

        Ok(change)
    }

    /// Frees `hotkey`. The hotkey stays in the alphabet. Returns the project
    /// that held it.
    pub fn clear(&mut self, hotkey: char) -> Option<String> {
        self.slots
            .iter_mut()
            .find(|s| s.hotkey == hotkey)
            .and_then(|s| s.path.take())
    }
}
