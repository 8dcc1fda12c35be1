//! Path normalization and default state/data locations.
//!
//! Every path persisted by the store goes through [`normalize`] so that
//! containment checks (`strip_prefix`) give the same answer regardless of the
//! working directory the command was started from.
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Return the user's home directory from `HOME` (or `USERPROFILE`).
///
/// # Errors
///
/// Returns [`ConfigError::NoHome`] if neither variable is set.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::NoHome)
}

/// Replace a leading `~` component with `home`.
///
/// `~user` forms are left untouched.
#[must_use]
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => home.join(components.as_path()),
        _ => path.to_path_buf(),
    }
}

/// Expand `~`, make the path absolute against the working directory and
/// remove `.`/`..` components lexically.
///
/// The result does not depend on whether the path exists.
///
/// # Errors
///
/// Returns an error if the path is relative and the current directory cannot
/// be determined.
pub fn normalize(path: &Path) -> io::Result<PathBuf> {
    let expanded = match home_dir() {
        Ok(home) => expand_home(path, &home),
        Err(_) => path.to_path_buf(),
    };
    let absolute = std::path::absolute(&expanded)?;
    Ok(clean(&absolute))
}

/// Lexically remove `.` and `..` components.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root.
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Base directory from an XDG variable, or `home/<fallback>` when unset.
fn xdg_dir(var: &str, home: &Path, fallback: &str) -> PathBuf {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map_or_else(|| home.join(fallback), PathBuf::from)
}

/// Default database location: `$XDG_STATE_HOME/stash/stash.sqlite`
/// (`~/.local/state/stash/stash.sqlite`).
#[must_use]
pub fn default_db_path(home: &Path) -> PathBuf {
    xdg_dir("XDG_STATE_HOME", home, ".local/state")
        .join("stash")
        .join("stash.sqlite")
}

/// Default render root: `$XDG_DATA_HOME/stash/rendered`
/// (`~/.local/share/stash/rendered`).
#[must_use]
pub fn default_render_root(home: &Path) -> PathBuf {
    xdg_dir("XDG_DATA_HOME", home, ".local/share")
        .join("stash")
        .join("rendered")
}

/// Return the `$XDG_CACHE_HOME/stash/` directory, creating it if needed.
pub(crate) fn cache_dir() -> Option<PathBuf> {
    let home = home_dir().unwrap_or_else(|_| PathBuf::from("."));
    let dir = xdg_dir("XDG_CACHE_HOME", &home, ".cache").join("stash");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
