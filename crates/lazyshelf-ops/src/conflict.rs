//! Conflict detection and resolution for file operations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lazyshelf_core::{ConflictPolicy, Result, ShelfError};

/// Upper bound on " (n)" candidates tried by [`free_name`].
pub const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// What the caller should do with an item after conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Perform the operation at this destination.
    Proceed(PathBuf),
    /// Leave the item alone.
    Skip,
}

/// Check whether anything (including a dangling symlink) exists at `path`.
///
/// "Not found" is a plain `false`; every other stat failure is an error.
pub fn path_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ShelfError::io(path, e)),
    }
}

/// Decide whether an operation from `source` may proceed at `destination`.
pub fn resolve_conflict(
    source: &Path,
    destination: &Path,
    policy: ConflictPolicy,
) -> Result<Resolution> {
    if !path_exists(destination)? {
        return Ok(Resolution::Proceed(destination.to_path_buf()));
    }

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        %policy,
        "destination exists"
    );

    match policy {
        ConflictPolicy::Skip => Ok(Resolution::Skip),
        ConflictPolicy::Overwrite => {
            // Follows symlinks: replacing a link to a directory is still a directory overwrite.
            let is_dir = match fs::metadata(destination) {
                Ok(metadata) => metadata.is_dir(),
                // Dangling symlink.
                Err(e) if e.kind() == io::ErrorKind::NotFound => false,
                Err(e) => return Err(ShelfError::io(destination, e)),
            };
            if is_dir {
                return Err(ShelfError::DirectoryOverwriteDenied {
                    path: destination.to_path_buf(),
                });
            }
            Ok(Resolution::Proceed(destination.to_path_buf()))
        }
        ConflictPolicy::Rename => free_name(destination).map(Resolution::Proceed),
    }
}

/// Find the first free sibling named "stem (n).ext".
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc. Names are
/// built from the raw OS strings, so non-UTF-8 bytes survive.
pub fn free_name(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().unwrap_or_default();
    let extension = path.extension();

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let mut new_name = stem.to_os_string();
        new_name.push(format!(" ({i})"));
        if let Some(ext) = extension {
            new_name.push(".");
            new_name.push(ext);
        }

        let candidate = parent.join(new_name);
        if !path_exists(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(ShelfError::NoFreeName {
        path: path.to_path_buf(),
        attempts: MAX_RENAME_ATTEMPTS,
    })
}
