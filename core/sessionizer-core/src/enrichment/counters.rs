//! Batch counter probes (notes, plans).
//!
//! The configured tool prints one JSON object keyed by project path. Keys are
//! canonicalized before lookup so `~/code/x` in the tool's output still lands
//! on `/home/me/code/x`.

use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::paths::canonicalize_path;

use super::{run_capture, ProbeTarget};

pub fn fetch_keyed<T: DeserializeOwned>(command: &[String]) -> Option<HashMap<String, T>> {
    let output = run_capture(command, None)?;
    parse_keyed(&output)
}

pub fn parse_keyed<T: DeserializeOwned>(output: &str) -> Option<HashMap<String, T>> {
    if output.trim().is_empty() {
        return Some(HashMap::new());
    }
    match serde_json::from_str::<HashMap<String, T>>(output) {
        Ok(raw) => Some(
            raw.into_iter()
                .map(|(path, value)| (canonicalize_path(&path), value))
                .collect(),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse counter listing");
            None
        }
    }
}

/// Picks each target's entry out of a keyed listing; absent entries are `None`.
pub fn lookup<T: Clone>(
    keyed: &HashMap<String, T>,
    targets: &[ProbeTarget],
) -> HashMap<String, Option<T>> {
    targets
        .iter()
        .map(|t| (t.path.clone(), keyed.get(&t.path).cloned()))
        .collect()
}
