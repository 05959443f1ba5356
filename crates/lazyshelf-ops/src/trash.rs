//! Reversible deletes through a per-job trash area.

use std::fs;
use std::path::{Path, PathBuf};

use lazyshelf_core::{Result, ShelfError};

use crate::conflict::path_exists;
use crate::move_op::move_path;

/// Where `source` goes when deleted as part of job `job_id`:
/// `<trash_root>/<job_id>/<basename>`.
pub fn trash_path(trash_root: &Path, job_id: &str, source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| ShelfError::invalid_path(source, "path has no file name"))?;
    Ok(trash_root.join(job_id).join(name))
}

/// Move `source` into the trash of job `job_id` and return where it went.
///
/// Two sources with the same basename in one job would share a slot; the
/// second is refused with [`ShelfError::TrashOccupied`] instead of
/// replacing the first. Nothing here ever purges the trash.
pub fn delete_to_trash(source: &Path, job_id: &str, trash_root: &Path) -> Result<PathBuf> {
    let target = trash_path(trash_root, job_id, source)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ShelfError::io(parent, e))?;
    }

    if path_exists(&target)? {
        return Err(ShelfError::TrashOccupied { path: target });
    }

    move_path(source, &target)?;
    tracing::debug!(source = %source.display(), trash = %target.display(), "moved to trash");
    Ok(target)
}
