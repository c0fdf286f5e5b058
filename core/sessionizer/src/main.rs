//! sessionizer: jump between development projects in tmux.
//!
//! ## Usage
//!
//! - `sessionizer`: interactive picker
//! - `sessionizer PATH`: create-or-switch to PATH without the picker
//! - `sessionizer setup ROOT...`: write search roots to the configuration
//! - `sessionizer bindings`: regenerate the hotkey artifact and reload tmux

mod keys;
mod logging;
mod render;
mod runtime;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use sessionizer_core::paths::{canonicalize_path, session_name};
use sessionizer_core::{
    load_config, save_config, CommandProber, Discovery, FsDiscovery, Multiplexer, ProjectCache,
    Result, SessionizerConfig, SessionizerError, Startup, StorageConfig, TmuxClient,
};

use crate::runtime::Services;

#[derive(Parser)]
#[command(name = "sessionizer")]
#[command(about = "Jump between development projects in tmux")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Configuration directory (default: $SESSIONIZER_CONFIG_DIR, then the
    /// platform config directory)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Open this project directly instead of showing the picker
    #[arg(value_name = "PATH")]
    path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add directories to scan for projects
    Setup {
        #[arg(value_name = "ROOT", required = true)]
        roots: Vec<String>,
    },

    /// Regenerate the tmux hotkey bindings and reload tmux
    Bindings,
}

fn main() {
    let cli = Cli::parse();

    let storage = match StorageConfig::resolve(cli.config_dir.clone()) {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("sessionizer: {}", err);
            std::process::exit(1);
        }
    };
    let _logging_guard = logging::init(&storage.logs_dir());

    if let Err(err) = run(cli, storage) {
        error!(error = %err, "sessionizer failed");
        eprintln!("sessionizer: {}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, storage: StorageConfig) -> Result<()> {
    storage.check_readable()?;
    storage
        .ensure_dirs()
        .map_err(|e| SessionizerError::io("creating configuration directories", e))?;
    let config = load_config(&storage.config_file())?;

    match cli.command {
        Some(Commands::Setup { roots }) => return setup(&storage, config, &roots),
        Some(Commands::Bindings) => return regenerate_bindings(&storage, &config),
        None => {}
    }

    let tmux = TmuxClient::connect()?;

    let config = if config.needs_setup() && cli.path.is_none() {
        match first_run(&storage, config)? {
            Some(config) => config,
            None => return Ok(()),
        }
    } else {
        config
    };

    let services = Services {
        discovery: Arc::new(FsDiscovery::new(&config, storage.access_history_file())),
        prober: Arc::new(CommandProber::new(
            config.probes.clone(),
            config.probe_concurrency,
        )),
        tmux: Arc::new(tmux),
        storage,
    };

    if let Some(path) = cli.path {
        return open_direct(&services, &path);
    }

    let cached = ProjectCache::new(&services.storage.cache_file()).load();
    if let Some(cache) = &cached {
        info!(
            nodes = cache.nodes.len(),
            saved_at = %cache.saved_at,
            "Loaded project cache"
        );
    }
    let refresh_interval = Duration::from_secs(config.refresh_interval_secs.max(1));
    let startup = Startup {
        cached: cached.map(|c| c.nodes),
        access_history: services.discovery.access_history(),
        current_session: services.tmux.current_session(),
        home: dirs::home_dir(),
        config,
    };
    runtime::run(&services, startup, refresh_interval)
}

fn open_direct(services: &Services, raw: &str) -> Result<()> {
    let path = canonicalize_path(raw);
    if !Path::new(&path).is_dir() {
        return Err(SessionizerError::InvalidProjectPath {
            path,
            reason: "not a directory".to_string(),
        });
    }
    let name = session_name(&path, dirs::home_dir().as_deref());
    runtime::open_project(services, &name, &path)
}

fn setup(storage: &StorageConfig, mut config: SessionizerConfig, roots: &[String]) -> Result<()> {
    let mut added = 0;
    for raw in roots {
        let root = canonicalize_path(raw);
        if !Path::new(&root).is_dir() {
            return Err(SessionizerError::InvalidProjectPath {
                path: root,
                reason: "search root is not a directory".to_string(),
            });
        }
        if !config.search_roots.contains(&root) {
            config.search_roots.push(root);
            added += 1;
        }
    }
    save_config(&storage.config_file(), &config)?;
    info!(added, "Updated search roots");
    println!(
        "Added {} search root(s) to {}",
        added,
        storage.config_file().display()
    );
    Ok(())
}

/// Asks for search roots on first launch. `None` means the operator declined.
fn first_run(
    storage: &StorageConfig,
    config: SessionizerConfig,
) -> Result<Option<SessionizerConfig>> {
    println!("No projects configured yet.");
    print!("Directories to scan for projects (space separated, empty to skip): ");
    io::stdout()
        .flush()
        .map_err(|e| SessionizerError::io("writing prompt", e))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| SessionizerError::io("reading search roots", e))?;
    let roots: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if roots.is_empty() {
        println!("Run `sessionizer setup ROOT...` when ready.");
        return Ok(None);
    }

    setup(storage, config, &roots)?;
    load_config(&storage.config_file()).map(Some)
}

fn regenerate_bindings(storage: &StorageConfig, config: &SessionizerConfig) -> Result<()> {
    runtime::write_bindings(storage, config)?;
    let artifact = storage.bindings_artifact();
    println!("Wrote {}", artifact.display());

    match TmuxClient::connect().and_then(|tmux| tmux.reload_config(&artifact)) {
        Ok(()) => println!("Reloaded tmux"),
        Err(err) => {
            warn!(error = %err, "tmux reload failed");
            println!("tmux not reloaded ({}). Add to tmux.conf:", err);
            println!("  source-file {}", artifact.display());
        }
    }
    Ok(())
}
