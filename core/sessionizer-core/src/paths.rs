//! Path canonicalization and multiplexer session naming.
//!
//! Every path that is compared anywhere in the crate goes through
//! [`canonicalize_path`] first, so two spellings of the same directory
//! (`~/code/x`, `/home/me/code/x/`, `./x` from `~/code`) collapse to one key.
//!
//! # Canonical Form
//!
//! 1. `~` and `~/...` are expanded against the home directory
//! 2. Relative paths are joined onto the working directory
//! 3. `.` and `..` segments and repeated separators are removed lexically
//! 4. Symlinks are resolved when the path exists on disk
//! 5. Trailing slashes are stripped (root stays `/`)

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static SESSION_NAME_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/.:\s]+").expect("valid session separator regex"));

/// Canonicalizes a path using the process home and working directories.
pub fn canonicalize_path(path: &str) -> String {
    let home = dirs::home_dir();
    let cwd = std::env::current_dir().ok();
    canonicalize_with(path, home.as_deref(), cwd.as_deref())
}

/// Canonicalizes a path against explicit home and working directories.
///
/// Idempotent: canonicalizing an already-canonical path returns it unchanged.
pub fn canonicalize_with(path: &str, home: Option<&Path>, cwd: Option<&Path>) -> String {
    let trimmed = path.trim();
    let expanded = expand_home(trimmed, home);
    let absolute = if Path::new(&expanded).is_absolute() {
        expanded
    } else {
        match cwd {
            Some(cwd) => format!("{}/{}", cwd.to_string_lossy(), expanded),
            None => expanded,
        }
    };
    let cleaned = clean_path(&absolute);
    let resolved = resolve_symlinks(&cleaned);
    strip_trailing_slashes(&resolved)
}

/// Expands a leading `~` to the home directory. Other paths are returned as-is.
pub fn expand_home(path: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return path.to_string();
    };
    let home = home.to_string_lossy();
    if path == "~" {
        home.to_string()
    } else if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", home.trim_end_matches('/'), rest)
    } else {
        path.to_string()
    }
}

/// Lexically normalizes a path: drops `.` segments, resolves `..` against
/// the preceding segment, and collapses repeated separators.
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Returns `path` with the home directory replaced by `~`.
pub fn tilde_path(path: &str, home: Option<&Path>) -> String {
    match home.and_then(|h| relative_to(path, &h.to_string_lossy())) {
        Some(rest) if rest.is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest),
        None => path.to_string(),
    }
}

/// Checks whether `child` is the same as `parent` or nested inside it.
/// Both paths must already be canonical.
pub fn is_same_or_descendant(parent: &str, child: &str) -> bool {
    if parent == child {
        return true;
    }
    if parent == "/" {
        return child.starts_with('/');
    }
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Last path component, or the path itself for `/`.
pub fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Derives the tmux session name for a canonical project path.
///
/// The name is the home-relative display path with separators, dots, colons
/// and whitespace folded into single underscores. tmux rejects `.` and `:`
/// in session names, and every caller that talks to tmux must agree on this
/// exact derivation, so it is total: an empty result becomes `_`.
pub fn session_name(path: &str, home: Option<&Path>) -> String {
    let display = home
        .and_then(|h| relative_to(path, &h.to_string_lossy()))
        .unwrap_or_else(|| path.to_string());
    let folded = SESSION_NAME_SEPARATORS.replace_all(&display, "_");
    let trimmed = folded.trim_matches('_');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

fn relative_to(path: &str, base: &str) -> Option<String> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    if path == base {
        return Some(String::new());
    }
    path.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}

/// Strips trailing slashes from a path, preserving root "/".
fn strip_trailing_slashes(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolves symlinks if the path exists on disk.
fn resolve_symlinks(path: &str) -> String {
    let path_obj = Path::new(path);

    // canonicalize fails on non-existent paths
    if path_obj.exists() {
        if let Ok(canonical) = path_obj.canonicalize() {
            return canonical.to_string_lossy().to_string();
        }
    }

    path.to_string()
}

/// Converts a path to an owned string key.
pub fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/dev";

    fn canon(path: &str) -> String {
        canonicalize_with(path, Some(Path::new(HOME)), Some(Path::new("/home/dev/code")))
    }

    #[test]
    fn strips_trailing_slash() {
        assert_eq!(canon("/nonexistent/project/"), "/nonexistent/project");
        assert_eq!(canon("/nonexistent/project//"), "/nonexistent/project");
    }

    #[test]
    fn preserves_root() {
        assert_eq!(canon("/"), "/");
        assert_eq!(canon("//"), "/");
    }

    #[test]
    fn expands_tilde_and_relative_paths_to_same_key() {
        let from_tilde = canon("~/code/widget");
        let from_relative = canon("widget");
        let from_absolute = canon("/home/dev/code/widget/");
        assert_eq!(from_tilde, "/home/dev/code/widget");
        assert_eq!(from_tilde, from_relative);
        assert_eq!(from_tilde, from_absolute);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for raw in ["~/code/a/../b", "./x/./y/", "/srv//app/.", "../sibling"] {
            let once = canon(raw);
            assert_eq!(canon(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn clean_path_resolves_dot_segments() {
        assert_eq!(clean_path("/a/./b/../c"), "/a/c");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path(""), ".");
    }

    #[test]
    fn resolves_existing_symlinks() {
        use std::fs;
        use tempfile::tempdir;

        let temp = tempdir().unwrap();
        let real_dir = temp.path().join("real");
        let link_path = temp.path().join("link");
        fs::create_dir(&real_dir).unwrap();

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&real_dir, &link_path).unwrap();
            let real = canonicalize_path(real_dir.to_str().unwrap());
            let link = canonicalize_path(link_path.to_str().unwrap());
            assert_eq!(real, link);
        }
    }

    #[test]
    fn descendant_check_requires_separator_boundary() {
        assert!(is_same_or_descendant("/code/app", "/code/app"));
        assert!(is_same_or_descendant("/code/app", "/code/app/src"));
        assert!(!is_same_or_descendant("/code/app", "/code/application"));
        assert!(is_same_or_descendant("/", "/anything"));
    }

    #[test]
    fn tilde_path_replaces_home_prefix() {
        let home = Some(Path::new(HOME));
        assert_eq!(tilde_path("/home/dev/code/x", home), "~/code/x");
        assert_eq!(tilde_path("/home/dev", home), "~");
        assert_eq!(tilde_path("/home/devops/x", home), "/home/devops/x");
    }

    #[test]
    fn session_name_folds_separators_and_dots() {
        let home = Some(Path::new(HOME));
        assert_eq!(session_name("/home/dev/code/my.app", home), "code_my_app");
        assert_eq!(session_name("/srv/api:v2", home), "srv_api_v2");
        assert_eq!(session_name("/home/dev/a  b", home), "a_b");
    }

    #[test]
    fn session_name_is_total() {
        let home = Some(Path::new(HOME));
        assert_eq!(session_name("/", home), "_");
        assert_eq!(session_name("/home/dev", home), "_");
        assert_eq!(session_name("", None), "_");
    }

    #[test]
    fn session_name_distinguishes_worktrees_from_parents() {
        let home = Some(Path::new(HOME));
        let parent = session_name("/home/dev/code/app", home);
        let worktree = session_name("/home/dev/code/app/.worktrees/fix", home);
        assert_ne!(parent, worktree);
        assert_eq!(worktree, "code_app_worktrees_fix");
    }
}
