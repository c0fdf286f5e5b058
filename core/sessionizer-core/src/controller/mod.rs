//! Session controller: the picker's state machine.
//!
//! Every input (keystroke, timer, probe result) arrives as a [`Message`].
//! [`Controller::update`] consumes the current state by value and returns the
//! next state plus the [`Effect`]s the runtime must carry out. Effects never
//! call back into the controller directly; their outcomes come back as further
//! messages. Only one message is processed at a time, so nothing here needs
//! locking.

mod input;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{PathDisplay, SessionizerConfig};
use crate::enrichment::{
    claim_targets, merge_update, EnrichmentClass, EnrichmentUpdate, LoadState, ProbeTarget,
};
use crate::keybindings::KeyBindingStore;
use crate::paths::{base_name, session_name};
use crate::view::{compute_view, ecosystem_choices, ProjectView, ViewEntry, ViewQuery};
use crate::workspace::{apply_aliases, WorkspaceNode};

pub use input::Key;

const STATUS_TTL: Duration = Duration::from_secs(3);
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(120);

// ═══════════════════════════════════════════════════════════════════════════════
// Messages and Effects
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Key(Key),
    /// Periodic refresh of every enrichment class and the session list.
    Tick,
    /// Loading-indicator frame.
    SpinnerTick,
    /// Rows available for the project list.
    Resize { height: usize },
    Discovered(Result<Vec<WorkspaceNode>, String>),
    Enriched(EnrichmentUpdate),
    Sessions(Vec<String>),
    /// Bindings re-read from the configuration store.
    BindingsLoaded(BTreeMap<String, String>),
    /// Outcome of save → regenerate artifact → reload.
    BindingsApplied(Result<(), String>),
    SessionKilled {
        name: String,
        result: Result<(), String>,
    },
    PaneCaptured {
        name: String,
        result: Result<String, String>,
    },
    /// Runtime-side failure worth showing to the operator.
    Notice(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Discover,
    Probe {
        class: EnrichmentClass,
        targets: Vec<ProbeTarget>,
    },
    ListSessions,
    /// Re-read hotkey bindings from the configuration store.
    LoadBindings,
    /// Persist the configuration, regenerate the binding artifact and reload
    /// tmux.
    ApplyBindings(SessionizerConfig),
    SaveConfig(SessionizerConfig),
    SaveCache(Vec<WorkspaceNode>),
    /// Leave the picker and create-or-switch to the session.
    Open { name: String, path: String },
    KillSession { name: String },
    CapturePane { name: String },
    /// Deliver a [`Message::SpinnerTick`] after [`SPINNER_INTERVAL`].
    ScheduleSpinner,
    Quit,
}

// ═══════════════════════════════════════════════════════════════════════════════
// State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Filtering,
    /// `path` is the project chosen when the mode was entered.
    EditingHotkey { path: String, highlighted: usize },
    EcosystemPicker { cursor: usize },
    Renaming { path: String, buffer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub expires_at: Instant,
}

/// Startup inputs gathered by the runtime before the first frame.
#[derive(Debug, Clone, Default)]
pub struct Startup {
    pub config: SessionizerConfig,
    /// Nodes from the project cache, if it loaded.
    pub cached: Option<Vec<WorkspaceNode>>,
    pub access_history: Vec<String>,
    pub current_session: Option<String>,
    pub home: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Controller {
    nodes: Vec<WorkspaceNode>,
    view: ProjectView,
    picker: ProjectView,
    cursor: usize,
    /// Path the cursor should stay on across recomputation.
    cursor_path: Option<String>,
    /// Set until the preferred startup row has been found or the operator moves.
    awaiting_initial: bool,
    scroll: usize,
    viewport_height: usize,
    mode: Mode,
    filter: String,
    dirty_only: bool,
    config: SessionizerConfig,
    bindings: KeyBindingStore,
    running_sessions: HashSet<String>,
    discovering: bool,
    spinner_frame: usize,
    spinner_scheduled: bool,
    status: Option<StatusMessage>,
    home: Option<PathBuf>,
    finished: bool,
}

impl Controller {
    /// Builds the initial state and the startup effects: discovery, session
    /// listing and, when the cache supplied nodes, a refresh of every class.
    pub fn new(startup: Startup) -> (Self, Vec<Effect>) {
        let Startup {
            config,
            cached,
            access_history,
            current_session,
            home,
        } = startup;

        let mut nodes = cached.unwrap_or_default();
        apply_aliases(&mut nodes, &config.aliases);

        let preferred = current_session
            .as_deref()
            .and_then(|current| {
                nodes
                    .iter()
                    .find(|n| session_name(&n.path, home.as_deref()) == current)
                    .map(|n| n.path.clone())
            })
            .or_else(|| access_history.first().cloned());

        let mut controller = Self {
            nodes,
            view: ProjectView::default(),
            picker: ProjectView::default(),
            cursor: 0,
            cursor_path: preferred.clone(),
            awaiting_initial: preferred.is_some(),
            scroll: 0,
            viewport_height: 0,
            mode: Mode::Normal,
            filter: String::new(),
            dirty_only: false,
            bindings: KeyBindingStore::from_config(&config),
            config,
            running_sessions: HashSet::new(),
            discovering: true,
            spinner_frame: 0,
            spinner_scheduled: false,
            status: None,
            home,
            finished: false,
        };
        controller.recompute();

        let mut effects = vec![Effect::Discover, Effect::ListSessions];
        controller.refresh_all(&mut effects);
        controller.ensure_spinner(&mut effects);
        (controller, effects)
    }

    pub fn update(mut self, message: Message) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        match message {
            Message::Key(key) => self.handle_key(key, &mut effects),
            Message::Tick => {
                effects.push(Effect::ListSessions);
                effects.push(Effect::LoadBindings);
                self.refresh_all(&mut effects);
            }
            Message::SpinnerTick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                if self.is_loading() {
                    effects.push(Effect::ScheduleSpinner);
                } else {
                    self.spinner_scheduled = false;
                }
            }
            Message::Resize { height } => {
                self.viewport_height = height;
                self.clamp_scroll();
                self.probe_visible(&mut effects);
            }
            Message::Discovered(Ok(nodes)) => self.replace_nodes(nodes, &mut effects),
            Message::Discovered(Err(err)) => {
                self.discovering = false;
                self.set_status(format!("Discovery failed: {}", err));
            }
            Message::Enriched(update) => {
                let class = update.class();
                let merged = merge_update(&mut self.nodes, update);
                tracing::debug!(class = class.label(), merged, "Merged enrichment");
                self.recompute();
            }
            Message::Sessions(names) => {
                self.running_sessions = names.into_iter().collect();
                self.recompute();
            }
            Message::BindingsLoaded(map) => {
                if map != self.config.bindings {
                    self.config.bindings = map;
                    self.bindings = KeyBindingStore::from_config(&self.config);
                }
            }
            Message::BindingsApplied(Ok(())) => {}
            Message::BindingsApplied(Err(err)) => {
                self.set_status(format!("Hotkeys saved, tmux reload failed: {}", err));
            }
            Message::SessionKilled { name, result } => {
                match result {
                    Ok(()) => self.set_status(format!("Killed session {}", name)),
                    Err(err) => self.set_status(format!("Could not kill {}: {}", name, err)),
                }
                effects.push(Effect::ListSessions);
            }
            Message::PaneCaptured { name, result } => match result {
                Ok(text) => {
                    let line = crate::tmux::last_visible_line(&text).unwrap_or("(empty pane)");
                    self.set_status(format!("{}: {}", name, line));
                }
                Err(err) => self.set_status(format!("Could not capture {}: {}", name, err)),
            },
            Message::Notice(text) => self.set_status(text),
        }
        self.ensure_spinner(&mut effects);
        (self, effects)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accessors for rendering
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn view(&self) -> &ProjectView {
        &self.view
    }

    pub fn picker(&self) -> &ProjectView {
        &self.picker
    }

    pub fn nodes(&self) -> &[WorkspaceNode] {
        &self.nodes
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn dirty_only(&self) -> bool {
        self.dirty_only
    }

    pub fn config(&self) -> &SessionizerConfig {
        &self.config
    }

    pub fn path_display(&self) -> PathDisplay {
        self.config.path_display
    }

    pub fn bindings(&self) -> &KeyBindingStore {
        &self.bindings
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn spinner_frame(&self) -> usize {
        self.spinner_frame
    }

    pub fn selected(&self) -> Option<&ViewEntry> {
        self.view.get(self.cursor).filter(|e| e.is_selectable())
    }

    pub fn is_running(&self, path: &str) -> bool {
        self.running_sessions
            .contains(&session_name(path, self.home.as_deref()))
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    pub fn is_class_loading(&self, class: EnrichmentClass) -> bool {
        self.nodes.iter().any(|n| n.enrichment.is_loading(class))
    }

    pub fn is_loading(&self) -> bool {
        self.discovering
            || EnrichmentClass::ALL
                .iter()
                .any(|&class| self.is_class_loading(class))
    }

    pub fn status_text(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|s| now < s.expires_at)
            .map(|s| s.text.as_str())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Internal transitions
    // ─────────────────────────────────────────────────────────────────────────────

    fn set_status(&mut self, text: String) {
        self.status = Some(StatusMessage {
            text,
            expires_at: Instant::now() + STATUS_TTL,
        });
    }

    fn session_for(&self, path: &str) -> String {
        session_name(path, self.home.as_deref())
    }

    /// Recomputes the view and re-places the cursor by path.
    fn recompute(&mut self) {
        let query = ViewQuery {
            filter: &self.filter,
            focus: self.config.focus.as_deref(),
            dirty_only: self.dirty_only,
            fold_worktrees: self.config.fold_worktrees,
            running_sessions: &self.running_sessions,
            home: self.home.as_deref(),
        };
        self.view = compute_view(&self.nodes, &query);

        let placed = self.view.reconcile(self.cursor_path.as_deref(), self.cursor);
        self.cursor = placed.unwrap_or(0);
        if let Some(entry) = placed.and_then(|i| self.view.get(i)) {
            let on_preferred = self.cursor_path.as_deref() == Some(entry.path());
            if on_preferred {
                self.awaiting_initial = false;
            } else if !self.awaiting_initial {
                self.cursor_path = Some(entry.path().to_string());
            }
        }
        self.clamp_scroll();
    }

    fn move_cursor_to(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let Some(entry) = self.view.get(index).filter(|e| e.is_selectable()) else {
            return;
        };
        self.cursor = index;
        self.cursor_path = Some(entry.path().to_string());
        self.awaiting_initial = false;
        self.clamp_scroll();
        self.probe_visible(effects);
    }

    fn clamp_scroll(&mut self) {
        let height = self.viewport_height;
        if height == 0 {
            self.scroll = 0;
            return;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + height {
            self.scroll = self.cursor + 1 - height;
        }
        self.scroll = self.scroll.min(self.view.len().saturating_sub(height));
    }

    /// Claims and dispatches a refresh of every visible class over the full set.
    fn refresh_all(&mut self, effects: &mut Vec<Effect>) {
        for class in EnrichmentClass::ALL {
            if !self.config.visibility.is_visible(class) {
                continue;
            }
            let targets = claim_targets(&mut self.nodes, class, None);
            if !targets.is_empty() {
                effects.push(Effect::Probe { class, targets });
            }
        }
    }

    /// On-demand git probes for rows in the scroll window that never had one.
    fn probe_visible(&mut self, effects: &mut Vec<Effect>) {
        if !self.config.visibility.git || self.viewport_height == 0 {
            return;
        }
        let window: HashSet<String> = self
            .view
            .window_paths(self.scroll, self.viewport_height)
            .into_iter()
            .collect();
        let unprobed: HashSet<String> = self
            .nodes
            .iter()
            .filter(|n| window.contains(&n.path))
            .filter(|n| n.enrichment.get(EnrichmentClass::Git) == LoadState::Unset)
            .map(|n| n.path.clone())
            .collect();
        if unprobed.is_empty() {
            return;
        }
        let targets = claim_targets(&mut self.nodes, EnrichmentClass::Git, Some(&unprobed));
        if !targets.is_empty() {
            effects.push(Effect::Probe {
                class: EnrichmentClass::Git,
                targets,
            });
        }
    }

    fn ensure_spinner(&mut self, effects: &mut Vec<Effect>) {
        if !self.spinner_scheduled && self.is_loading() {
            self.spinner_scheduled = true;
            effects.push(Effect::ScheduleSpinner);
        }
    }

    /// Swaps in a fresh discovery result, carrying enrichment over by path.
    fn replace_nodes(&mut self, mut fresh: Vec<WorkspaceNode>, effects: &mut Vec<Effect>) {
        let previous: HashMap<&str, &WorkspaceNode> =
            self.nodes.iter().map(|n| (n.path.as_str(), n)).collect();
        for node in &mut fresh {
            if let Some(prev) = previous.get(node.path.as_str()) {
                node.inherit_enrichment(prev);
            }
        }
        apply_aliases(&mut fresh, &self.config.aliases);

        self.nodes = fresh;
        self.discovering = false;
        self.recompute();
        if let Mode::EcosystemPicker { cursor } = &mut self.mode {
            self.picker = ecosystem_choices(&self.nodes);
            *cursor = (*cursor).min(self.picker.len().saturating_sub(1));
        }

        effects.push(Effect::SaveCache(self.nodes.clone()));
        self.refresh_all(effects);
    }

    fn start_discovery(&mut self, effects: &mut Vec<Effect>) {
        if self.discovering {
            return;
        }
        self.discovering = true;
        effects.push(Effect::Discover);
    }

    fn set_alias(&mut self, path: &str, alias: Option<String>) {
        match alias {
            Some(alias) => {
                self.config.aliases.insert(path.to_string(), alias);
            }
            None => {
                self.config.aliases.remove(path);
            }
        }
        if let Some(node) = self.nodes.iter_mut().find(|n| n.path == path) {
            node.name = self
                .config
                .aliases
                .get(path)
                .cloned()
                .unwrap_or_else(|| base_name(path));
        }
        self.recompute();
    }

    fn quit(&mut self, effects: &mut Vec<Effect>) {
        self.finished = true;
        effects.push(Effect::SaveCache(self.nodes.clone()));
        effects.push(Effect::Quit);
    }

    fn open_selected(&mut self, effects: &mut Vec<Effect>) {
        let Some(path) = self.selected().map(|e| e.path().to_string()) else {
            return;
        };
        self.finished = true;
        effects.push(Effect::SaveCache(self.nodes.clone()));
        effects.push(Effect::Open {
            name: self.session_for(&path),
            path,
        });
    }
}
