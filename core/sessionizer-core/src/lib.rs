//! # sessionizer-core
//!
//! Engine behind the `sessionizer` picker: discovers development projects,
//! keeps their live attributes current, and turns them into the list the
//! operator navigates.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Background work is plain threads; the
//!   binary owns them.
//! - **Pure controller**: [`Controller::update`] maps a message to the next
//!   state plus [`Effect`]s. It performs no I/O, which keeps every transition
//!   testable without a terminal or tmux.
//! - **Graceful degradation**: Missing cache, history or tool output yields
//!   empty values, not errors. Only configuration problems are fatal.
//! - **Paths are identity**: Nodes, bindings, aliases and focus all key on the
//!   canonical path.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sessionizer_core::{Controller, Message, Startup};
//!
//! let (controller, effects) = Controller::new(Startup::default());
//! // run `effects`, feed results back as `Message`s
//! let (controller, effects) = controller.update(Message::Tick);
//! ```

pub mod artifact;
pub mod cache;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod enrichment;
pub mod error;
pub mod keybindings;
pub mod paths;
pub mod storage;
pub mod tmux;
pub mod view;
pub mod workspace;

pub use artifact::ArtifactSettings;
pub use cache::{CachedProjects, ProjectCache};
pub use config::{load_config, save_config, PathDisplay, SessionizerConfig, Visibility};
pub use controller::{Controller, Effect, Key, Message, Mode, Startup, SPINNER_INTERVAL};
pub use discovery::{Discovery, FsDiscovery};
pub use enrichment::{
    CommandProber, EnrichmentClass, EnrichmentUpdate, LoadState, ProbeTarget, Prober,
};
pub use error::{Result, SessionizerError};
pub use keybindings::{KeyBinding, KeyBindingStore};
pub use paths::session_name;
pub use storage::StorageConfig;
pub use tmux::{Multiplexer, TmuxClient};
pub use view::{compute_view, MatchQuality, ProjectView, ViewEntry, ViewQuery};
pub use workspace::{
    AgentSession, AgentState, GitStatus, NoteCounts, PlanStats, ProjectKind, RuleStatus,
    WorkspaceNode,
};
