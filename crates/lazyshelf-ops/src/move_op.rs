//! Move and remove primitives.

use std::fs;
use std::io;
use std::path::Path;

use lazyshelf_core::{Result, ShelfError};

use crate::copy::{copy_file, copy_tree};

/// Move `source` to `dest`.
///
/// Tries an atomic rename first. If that fails for any reason the item is
/// copied and the source is removed only once the copy is complete, so a
/// failed fallback never loses the source.
///
/// When the copy completes but removing the source fails, the error is
/// [`ShelfError::SourceNotRemoved`] and `dest` holds the only full copy.
pub fn move_path(source: &Path, dest: &Path) -> Result<()> {
    move_with(source, dest, |from, to| fs::rename(from, to), remove_path)
}

/// [`move_path`] with caller-supplied rename and remove steps.
pub(crate) fn move_with<R, D>(source: &Path, dest: &Path, rename: R, remove: D) -> Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
    D: FnOnce(&Path) -> Result<()>,
{
    let rename_err = match rename(source, dest) {
        Ok(()) => {
            tracing::debug!(source = %source.display(), dest = %dest.display(), "renamed");
            return Ok(());
        }
        Err(e) => e,
    };

    tracing::debug!(
        source = %source.display(),
        dest = %dest.display(),
        error = %rename_err,
        "rename failed, falling back to copy and delete"
    );

    let metadata = fs::symlink_metadata(source).map_err(|e| ShelfError::io(source, e))?;
    if metadata.is_dir() {
        copy_tree(source, dest)?;
    } else {
        copy_file(source, dest)?;
    }

    remove(source).map_err(|e| ShelfError::SourceNotRemoved {
        source_path: source.to_path_buf(),
        destination: dest.to_path_buf(),
        cause: Box::new(e),
    })
}

/// Recursively remove whatever sits at `path`. A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ShelfError::io(path, e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ShelfError::io(path, e))
}
