//! File and directory copy primitives.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use filetime::FileTime;
use lazyshelf_core::{Result, ShelfError};

/// Copy a single file from `source` to `dest`.
///
/// Symlinks are recreated with the same target instead of being followed.
/// Regular files are streamed into a truncated `dest`, take the source's
/// permission bits and finally its modification time. A failure to set the
/// timestamp is logged; the copy itself still counts as complete.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(source).map_err(|e| ShelfError::io(source, e))?;
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        let target = fs::read_link(source).map_err(|e| ShelfError::io(source, e))?;
        symlink(&target, dest).map_err(|e| ShelfError::io(dest, e))?;
        tracing::debug!(source = %source.display(), dest = %dest.display(), "recreated symlink");
        return Ok(());
    }

    if !file_type.is_file() {
        return Err(ShelfError::NotRegularFile {
            path: source.to_path_buf(),
        });
    }

    let mut reader = File::open(source).map_err(|e| ShelfError::io(source, e))?;
    let mut writer = create_truncated(dest, &metadata).map_err(|e| ShelfError::io(dest, e))?;
    let bytes = io::copy(&mut reader, &mut writer).map_err(|e| ShelfError::io(dest, e))?;
    drop(writer);

    fs::set_permissions(dest, metadata.permissions()).map_err(|e| ShelfError::io(dest, e))?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(e) = filetime::set_file_mtime(dest, mtime) {
        tracing::warn!(path = %dest.display(), error = %e, "failed to preserve modification time");
    }

    tracing::debug!(source = %source.display(), dest = %dest.display(), bytes, "copied file");
    Ok(())
}

/// Recursively copy the directory `source` to `dest`.
///
/// Stops at the first failure. A partially copied `dest` is left behind for
/// the caller to deal with.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|e| ShelfError::io(source, e))?;
    if !metadata.is_dir() {
        return Err(ShelfError::NotADirectory {
            path: source.to_path_buf(),
        });
    }

    fs::create_dir_all(dest).map_err(|e| ShelfError::io(dest, e))?;

    let entries = fs::read_dir(source).map_err(|e| ShelfError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ShelfError::io(source, e))?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| ShelfError::io(&path, e))?;

        if file_type.is_dir() {
            copy_tree(&path, &dest_path)?;
        } else {
            copy_file(&path, &dest_path)?;
        }
    }

    // Applied last so a read-only source directory can still be filled.
    fs::set_permissions(dest, metadata.permissions()).map_err(|e| ShelfError::io(dest, e))?;

    tracing::debug!(source = %source.display(), dest = %dest.display(), "copied tree");
    Ok(())
}

#[cfg(unix)]
fn create_truncated(dest: &Path, metadata: &fs::Metadata) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(metadata.permissions().mode())
        .open(dest)
}

#[cfg(not(unix))]
fn create_truncated(dest: &Path, _metadata: &fs::Metadata) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dest)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    // Resolve relative targets against the link's directory to pick the link flavour.
    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported"))
}
