//! Resolution of user-facing paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ShelfError};

/// Turn a user-facing path into an absolute one.
///
/// A leading `~` expands to the current user's home directory; anything else
/// is joined onto the current directory. The result is lexically cleaned.
pub fn resolve_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ShelfError::invalid_path(path, "path is empty"));
    }

    let mut components = path.components();
    let absolute = match components.next() {
        Some(Component::Normal(first)) if first == "~" => home_dir(path)?.join(components.as_path()),
        _ if path.is_absolute() => path.to_path_buf(),
        _ => std::env::current_dir()
            .map_err(|e| ShelfError::io(path, e))?
            .join(path),
    };

    Ok(clean(&absolute))
}

fn home_dir(path: &Path) -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| ShelfError::invalid_path(path, "home directory cannot be determined"))
}

/// Lexically normalize `.` and `..` without touching the filesystem.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." at the root stays at the root
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}
