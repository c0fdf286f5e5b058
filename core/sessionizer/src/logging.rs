//! File logging. The picker owns the terminal, so nothing is written to
//! stdout or stderr while it runs.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "SESSIONIZER_DEBUG_LOG";

/// Installs a daily-rotated file subscriber under `logs_dir`.
///
/// Returns the writer guard; logs are flushed when it drops. `None` means the
/// directory could not be created and logging stays disabled.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(err) = fs_err::create_dir_all(logs_dir) {
        eprintln!("sessionizer: logging disabled: {}", err);
        return None;
    }

    let appender = tracing_appender::rolling::daily(logs_dir, "sessionizer.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
