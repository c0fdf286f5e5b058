//! Terminal runtime: owns the screen, the input thread and the timers, and
//! carries out the controller's effects.
//!
//! Everything blocking (discovery, probes, tmux calls) runs on short-lived
//! threads that report back through one channel. The loop applies one
//! message at a time and redraws after each.

use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info, warn};

use sessionizer_core::{
    artifact, load_config, save_config, Controller, Discovery, Effect, KeyBindingStore, Message,
    Multiplexer, ProjectCache, Prober, Result, SessionizerError, Startup, StorageConfig,
    SPINNER_INTERVAL,
};

use crate::{keys, render};

const INPUT_POLL: Duration = Duration::from_millis(100);
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// Collaborators the effects are executed against.
pub struct Services {
    pub storage: StorageConfig,
    pub tmux: Arc<dyn Multiplexer>,
    pub discovery: Arc<dyn Discovery>,
    pub prober: Arc<dyn Prober>,
}

/// How the picker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Quit,
    Open { name: String, path: String },
}

/// Runs the picker until the operator opens a project or quits, then
/// performs the open after the terminal has been restored.
pub fn run(services: &Services, startup: Startup, refresh_interval: Duration) -> Result<()> {
    let outcome = {
        let mut terminal = TerminalGuard::enter()?;
        event_loop(&mut terminal, services, startup, refresh_interval)?
    };

    match outcome {
        Outcome::Quit => Ok(()),
        Outcome::Open { name, path } => open_project(services, &name, &path),
    }
}

/// Create-or-switch, then remember the project for the next startup.
pub fn open_project(services: &Services, name: &str, path: &str) -> Result<()> {
    info!(session = %name, path = %path, "Opening project");
    services.tmux.open(name, path)?;
    if let Err(err) = services.discovery.record_access(path) {
        warn!(error = %err, path = %path, "Failed to record access history");
    }
    Ok(())
}

fn event_loop(
    terminal: &mut TerminalGuard,
    services: &Services,
    startup: Startup,
    refresh_interval: Duration,
) -> Result<Outcome> {
    let (tx, rx) = mpsc::channel::<Message>();
    let stop = Arc::new(AtomicBool::new(false));
    let input = spawn_input(tx.clone(), Arc::clone(&stop));
    spawn_ticker(tx.clone(), Arc::clone(&stop), refresh_interval);

    let (mut controller, effects) = Controller::new(startup);
    let mut outcome = dispatch(services, &tx, effects);
    let mut list_height = 0;

    let result = loop {
        if let Some(done) = outcome.take() {
            break Ok(done);
        }

        let mut drawn_height = list_height;
        if let Err(err) = terminal
            .inner
            .draw(|f| drawn_height = render::draw(f, &controller, Instant::now()))
        {
            break Err(SessionizerError::io("drawing frame", err));
        }
        if drawn_height != list_height {
            list_height = drawn_height;
            let (next, effects) = controller.update(Message::Resize {
                height: list_height,
            });
            controller = next;
            outcome = dispatch(services, &tx, effects);
            continue;
        }

        // Redraw periodically so status messages expire and resizes land.
        let message = match rx.recv_timeout(REDRAW_INTERVAL) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break Ok(Outcome::Quit),
        };
        let (next, effects) = controller.update(message);
        controller = next;
        outcome = dispatch(services, &tx, effects);
    };

    stop.store(true, Ordering::Relaxed);
    if input.join().is_err() {
        warn!("Input thread panicked");
    }
    result
}

/// Executes effects in order. Returns the outcome when one ends the session.
fn dispatch(services: &Services, tx: &Sender<Message>, effects: Vec<Effect>) -> Option<Outcome> {
    let mut outcome = None;
    for effect in effects {
        if let Some(done) = execute(services, tx, effect) {
            outcome = Some(done);
        }
    }
    outcome
}

fn execute(services: &Services, tx: &Sender<Message>, effect: Effect) -> Option<Outcome> {
    match effect {
        Effect::Discover => {
            let discovery = Arc::clone(&services.discovery);
            spawn_reply(tx, move || {
                let started = Instant::now();
                let result = discovery.discover();
                match &result {
                    Ok(nodes) => info!(
                        count = nodes.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Discovery finished"
                    ),
                    Err(err) => warn!(error = %err, "Discovery failed"),
                }
                Message::Discovered(result.map_err(|e| e.to_string()))
            });
        }
        Effect::Probe { class, targets } => {
            debug!(class = class.label(), targets = targets.len(), "Dispatching probe");
            let prober = Arc::clone(&services.prober);
            spawn_reply(tx, move || Message::Enriched(prober.probe(class, &targets)));
        }
        Effect::ListSessions => {
            let tmux = Arc::clone(&services.tmux);
            spawn_reply(tx, move || Message::Sessions(tmux.list_sessions()));
        }
        Effect::LoadBindings => match load_config(&services.storage.config_file()) {
            Ok(config) => send(tx, Message::BindingsLoaded(config.bindings)),
            Err(err) => warn!(error = %err, "Failed to reload hotkey bindings"),
        },
        Effect::ApplyBindings(config) => {
            if let Err(err) = write_bindings(&services.storage, &config) {
                warn!(error = %err, "Failed to persist hotkey bindings");
                send(tx, Message::Notice(format!("Could not save hotkeys: {}", err)));
                return None;
            }
            let tmux = Arc::clone(&services.tmux);
            let artifact_path = services.storage.bindings_artifact();
            spawn_reply(tx, move || {
                let result = tmux.reload_config(&artifact_path);
                if let Err(err) = &result {
                    warn!(error = %err, "tmux reload failed");
                }
                Message::BindingsApplied(result.map_err(|e| e.to_string()))
            });
        }
        Effect::SaveConfig(config) => {
            if let Err(err) = save_config(&services.storage.config_file(), &config) {
                warn!(error = %err, "Failed to save configuration");
                send(tx, Message::Notice(format!("Could not save settings: {}", err)));
            }
        }
        Effect::SaveCache(nodes) => {
            let cache = ProjectCache::new(&services.storage.cache_file());
            if let Err(err) = cache.save(&nodes) {
                warn!(error = %err, "Failed to save project cache");
            }
        }
        Effect::Open { name, path } => return Some(Outcome::Open { name, path }),
        Effect::KillSession { name } => {
            let tmux = Arc::clone(&services.tmux);
            spawn_reply(tx, move || Message::SessionKilled {
                result: tmux.kill_session(&name).map_err(|e| e.to_string()),
                name,
            });
        }
        Effect::CapturePane { name } => {
            let tmux = Arc::clone(&services.tmux);
            spawn_reply(tx, move || Message::PaneCaptured {
                result: tmux.capture_pane(&name).map_err(|e| e.to_string()),
                name,
            });
        }
        Effect::ScheduleSpinner => spawn_reply(tx, || {
            thread::sleep(SPINNER_INTERVAL);
            Message::SpinnerTick
        }),
        Effect::Quit => return Some(Outcome::Quit),
    }
    None
}

/// Saves the configuration and regenerates the binding artifact.
pub fn write_bindings(
    storage: &StorageConfig,
    config: &sessionizer_core::SessionizerConfig,
) -> Result<()> {
    save_config(&storage.config_file(), config)?;
    let store = KeyBindingStore::from_config(config);
    artifact::write(&storage.bindings_artifact(), &store, &config.into())
}

fn send(tx: &Sender<Message>, message: Message) {
    // The receiver only goes away during shutdown.
    let _ = tx.send(message);
}

fn spawn_reply<F>(tx: &Sender<Message>, work: F)
where
    F: FnOnce() -> Message + Send + 'static,
{
    let tx = tx.clone();
    thread::spawn(move || {
        let _ = tx.send(work());
    });
}

fn spawn_input(tx: Sender<Message>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(INPUT_POLL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(error = %err, "Terminal input poll failed");
                    break;
                }
            }
            let message = match event::read() {
                Ok(Event::Key(key)) => keys::translate(key).map(Message::Key),
                // Resizes are picked up by the next redraw.
                Ok(_) => None,
                Err(err) => {
                    warn!(error = %err, "Terminal input read failed");
                    break;
                }
            };
            if let Some(message) = message {
                if tx.send(message).is_err() {
                    break;
                }
            }
        }
    })
}

fn spawn_ticker(tx: Sender<Message>, stop: Arc<AtomicBool>, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if stop.load(Ordering::Relaxed) || tx.send(Message::Tick).is_err() {
            break;
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminal
// ─────────────────────────────────────────────────────────────────────────────

struct TerminalGuard {
    inner: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().map_err(|e| SessionizerError::io("enabling raw mode", e))?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(SessionizerError::io("entering alternate screen", err));
        }
        let inner = Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| SessionizerError::io("creating terminal", e))?;
        Ok(Self { inner })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.inner.backend_mut(), LeaveAlternateScreen);
        let _ = self.inner.show_cursor();
    }
}
