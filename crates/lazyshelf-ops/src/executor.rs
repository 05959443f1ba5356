//! Batch execution of shelf actions into recorded jobs.

use std::fs;
use std::path::{Path, PathBuf};

use lazyshelf_core::{ConflictPolicy, Job, JobItem, JobKind, OpKind, Result, ShelfError};

use crate::conflict::{Resolution, path_exists, resolve_conflict};
use crate::copy::{copy_file, copy_tree};
use crate::manager::JobManager;
use crate::move_op::{move_path, remove_path};
use crate::trash::delete_to_trash;
use crate::undo::UndoReport;

/// Whether a staged path is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// How a staged item is put into the target directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

impl From<TransferMode> for OpKind {
    fn from(mode: TransferMode) -> Self {
        match mode {
            TransferMode::Copy => OpKind::Copy,
            TransferMode::Move => OpKind::Move,
        }
    }
}

/// One shelf entry handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedItem {
    /// Absolute path of the staged entry.
    pub path: PathBuf,
    pub kind: EntryKind,
    pub mode: TransferMode,
}

impl StagedItem {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind, mode: TransferMode) -> Self {
        Self {
            path: path.into(),
            kind,
            mode,
        }
    }

    /// Stage `path`, reading its kind from the filesystem.
    pub fn from_path(path: impl Into<PathBuf>, mode: TransferMode) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path).map_err(|e| ShelfError::io(&path, e))?;
        let kind = if metadata.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Ok(Self { path, kind, mode })
    }
}

/// Runs put and delete batches, recording each as a saved job.
#[derive(Debug, Clone)]
pub struct ShelfExecutor {
    manager: JobManager,
    policy: ConflictPolicy,
}

impl ShelfExecutor {
    /// Create an executor using the default `skip` policy.
    pub fn new(manager: JobManager) -> Self {
        Self {
            manager,
            policy: ConflictPolicy::default(),
        }
    }

    /// Set the conflict policy for puts.
    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    /// Put every staged item into `target_dir`.
    ///
    /// Item failures are recorded in the job and never stop the batch; only
    /// failing to save the job is an error.
    pub fn put(&self, items: &[StagedItem], target_dir: &Path) -> Result<Job> {
        let mut job = self.manager.create_job(JobKind::Put);

        for (index, item) in items.iter().enumerate() {
            let recorded = self.put_item(&job.id, index, item, target_dir);
            job.push(recorded);
        }

        self.manager.save_job(&job)?;
        Ok(job)
    }

    /// Move every path into this job's trash.
    pub fn delete(&self, paths: &[PathBuf]) -> Result<Job> {
        let mut job = self.manager.create_job(JobKind::Delete);

        for path in paths {
            let item = match delete_to_trash(path, &job.id, self.manager.trash_dir()) {
                Ok(trash) => JobItem::trashed(path.clone(), trash),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "delete failed");
                    let trash = e.kept_destination().map(Path::to_path_buf);
                    JobItem::failed(path.clone(), None, OpKind::Delete, e).with_trash(trash)
                }
            };
            job.push(item);
        }

        self.manager.save_job(&job)?;
        Ok(job)
    }

    /// Undo the most recent job.
    pub fn undo_latest(&self) -> Result<Option<UndoReport>> {
        self.manager.undo_latest()
    }

    fn put_item(&self, job_id: &str, index: usize, item: &StagedItem, target_dir: &Path) -> JobItem {
        let op = OpKind::from(item.mode);
        let src = item.path.clone();

        let Some(name) = src.file_name() else {
            let err = ShelfError::invalid_path(&src, "path has no file name");
            return JobItem::failed(src, None, op, err);
        };
        let dst = target_dir.join(name);

        if item.kind == EntryKind::Dir && dst.starts_with(&src) {
            let err = ShelfError::DestinationInsideSource {
                source_path: src.clone(),
                destination: dst.clone(),
            };
            return JobItem::failed(src, Some(dst), op, err);
        }

        let final_dst = match resolve_conflict(&src, &dst, self.policy) {
            Ok(Resolution::Proceed(path)) => path,
            Ok(Resolution::Skip) => {
                tracing::debug!(source = %src.display(), dest = %dst.display(), "skipped");
                return JobItem::skipped(src, dst, op);
            }
            Err(e) => return JobItem::failed(src, Some(dst), op, e),
        };

        let backup = match self.displace_existing(job_id, index, &final_dst) {
            Ok(backup) => backup,
            Err(e) => {
                // A half-finished displacement still left a full backup behind.
                let backup = e.kept_destination().map(Path::to_path_buf);
                return JobItem::failed(src, Some(final_dst), op, e).with_backup(backup);
            }
        };

        match transfer(item, &final_dst) {
            Ok(()) => JobItem::transferred(src, final_dst, op).with_backup(backup),
            Err(e) => settle_failed_transfer(src, final_dst, op, backup, e),
        }
    }

    /// Under the overwrite policy, relocate an existing destination to
    /// `<backups>/<job>/<index>/<name>` so undo can bring it back.
    fn displace_existing(&self, job_id: &str, index: usize, dest: &Path) -> Result<Option<PathBuf>> {
        if self.policy != ConflictPolicy::Overwrite || !path_exists(dest)? {
            return Ok(None);
        }

        let Some(name) = dest.file_name() else {
            return Err(ShelfError::invalid_path(dest, "path has no file name"));
        };
        let slot = self.manager.backup_dir().join(job_id).join(index.to_string());
        fs::create_dir_all(&slot).map_err(|e| ShelfError::io(&slot, e))?;

        let backup = slot.join(name);
        move_path(dest, &backup)?;
        tracing::debug!(dest = %dest.display(), backup = %backup.display(), "displaced existing destination");
        Ok(Some(backup))
    }
}

fn transfer(item: &StagedItem, dest: &Path) -> Result<()> {
    match (item.mode, item.kind) {
        (TransferMode::Move, _) => move_path(&item.path, dest),
        (TransferMode::Copy, EntryKind::Dir) => copy_tree(&item.path, dest),
        (TransferMode::Copy, EntryKind::File) => copy_file(&item.path, dest),
    }
}

/// Record a failed transfer.
///
/// A move that copied everything but could not remove its source keeps the
/// destination, which is then the only full copy, and records it for undo.
/// Any other failure puts the displaced destination back.
fn settle_failed_transfer(
    src: PathBuf,
    dest: PathBuf,
    op: OpKind,
    backup: Option<PathBuf>,
    error: ShelfError,
) -> JobItem {
    tracing::warn!(source = %src.display(), dest = %dest.display(), error = %error, "put failed");

    if error.kept_destination().is_some() {
        return JobItem::failed(src, Some(dest.clone()), op, error)
            .with_created(Some(dest))
            .with_backup(backup);
    }

    let unrestored = backup.filter(|b| !restore_displaced(b, &dest));
    JobItem::failed(src, Some(dest), op, error).with_backup(unrestored)
}

/// Put a displaced destination back after a failed transfer. Returns whether it worked.
fn restore_displaced(backup: &Path, dest: &Path) -> bool {
    let restored = remove_path(dest).and_then(|()| move_path(backup, dest));
    match restored {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(backup = %backup.display(), dest = %dest.display(), error = %e, "could not restore displaced destination");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyshelf_core::{EngineConfig, ItemStatus};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        target: PathBuf,
        executor: ShelfExecutor,
    }

    fn fixture(policy: ConflictPolicy) -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a");
        let target = dir.path().join("b");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        let manager = JobManager::open(&EngineConfig::new(dir.path().join("cfg"))).unwrap();
        Fixture {
            _dir: dir,
            source,
            target,
            executor: ShelfExecutor::new(manager).with_policy(policy),
        }
    }

    #[test]
    fn test_default_policy_is_skip() {
        let f = fixture(ConflictPolicy::Skip);
        let executor = ShelfExecutor::new(f.executor.manager().clone());
        assert_eq!(executor.policy(), ConflictPolicy::Skip);
    }

    #[test]
    fn test_put_copy_file() {
        let f = fixture(ConflictPolicy::Skip);
        let src = f.source.join("x.txt");
        fs::write(&src, "x").unwrap();

        let job = f
            .executor
            .put(&[StagedItem::new(&src, EntryKind::File, TransferMode::Copy)], &f.target)
            .unwrap();

        let item = &job.items[0];
        assert_eq!(item.status, ItemStatus::Ok);
        assert_eq!(item.op, OpKind::Copy);
        assert_eq!(item.created_path, Some(f.target.join("x.txt")));
        assert!(src.exists());
        assert_eq!(fs::read_to_string(f.target.join("x.txt")).unwrap(), "x");
    }

    #[test]
    fn test_put_rename_policy() {
        let f = fixture(ConflictPolicy::Rename);
        let src = f.source.join("x.txt");
        fs::write(&src, "new").unwrap();
        fs::write(f.target.join("x.txt"), "old").unwrap();

        let job = f
            .executor
            .put(&[StagedItem::new(&src, EntryKind::File, TransferMode::Copy)], &f.target)
            .unwrap();

        assert_eq!(job.items[0].created_path, Some(f.target.join("x (1).txt")));
        assert_eq!(fs::read_to_string(f.target.join("x.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(f.target.join("x (1).txt")).unwrap(), "new");
    }

    #[test]
    fn test_put_overwrite_keeps_backup() {
        let f = fixture(ConflictPolicy::Overwrite);
        let src = f.source.join("x.txt");
        fs::write(&src, "new").unwrap();
        fs::write(f.target.join("x.txt"), "old").unwrap();

        let job = f
            .executor
            .put(&[StagedItem::new(&src, EntryKind::File, TransferMode::Copy)], &f.target)
            .unwrap();

        let backup = job.items[0].backup_path.clone().unwrap();
        assert!(backup.starts_with(f.executor.manager().backup_dir().join(&job.id)));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old");
        assert_eq!(fs::read_to_string(f.target.join("x.txt")).unwrap(), "new");
    }

    #[test]
    fn test_put_overwrite_directory_is_item_error() {
        let f = fixture(ConflictPolicy::Overwrite);
        let src = f.source.join("d");
        fs::create_dir(&src).unwrap();
        fs::create_dir(f.target.join("d")).unwrap();

        let job = f
            .executor
            .put(&[StagedItem::new(&src, EntryKind::Dir, TransferMode::Move)], &f.target)
            .unwrap();

        assert!(job.items[0].status.error().unwrap().contains("Cannot overwrite directory"));
        assert!(src.exists());
    }

    #[test]
    fn test_put_into_itself_is_rejected() {
        let f = fixture(ConflictPolicy::Skip);
        let src = f.source.join("d");
        fs::create_dir(&src).unwrap();

        let job = f
            .executor
            .put(&[StagedItem::new(&src, EntryKind::Dir, TransferMode::Copy)], &src)
            .unwrap();

        assert!(matches!(job.items[0].status, ItemStatus::Error { .. }));
        assert!(!src.join("d").exists());
    }

    #[test]
    fn test_failed_item_does_not_stop_batch() {
        let f = fixture(ConflictPolicy::Skip);
        let missing = f.source.join("missing.txt");
        let present = f.source.join("present.txt");
        fs::write(&present, "p").unwrap();

        let job = f
            .executor
            .put(
                &[
                    StagedItem::new(&missing, EntryKind::File, TransferMode::Copy),
                    StagedItem::new(&present, EntryKind::File, TransferMode::Move),
                ],
                &f.target,
            )
            .unwrap();

        assert!(matches!(job.items[0].status, ItemStatus::Error { .. }));
        assert_eq!(job.items[1].status, ItemStatus::Ok);
        assert_eq!(job.moved_sources().collect::<Vec<_>>(), vec![present.as_path()]);
    }

    #[test]
    fn test_delete_records_trash_paths() {
        let f = fixture(ConflictPolicy::Skip);
        let src = f.source.join("y.txt");
        fs::write(&src, "y").unwrap();

        let job = f.executor.delete(&[src.clone(), f.source.join("ghost")]).unwrap();

        assert_eq!(job.kind, JobKind::Delete);
        assert_eq!(job.items[0].status, ItemStatus::Ok);
        assert_eq!(
            job.items[0].trash_path,
            Some(f.executor.manager().trash_dir().join(&job.id).join("y.txt"))
        );
        assert!(matches!(job.items[1].status, ItemStatus::Error { .. }));
        assert!(!src.exists());
    }

    #[test]
    fn test_incomplete_move_keeps_destination_and_backup() {
        let f = fixture(ConflictPolicy::Overwrite);
        let src = f.source.join("dir");
        let dest = f.target.join("dir");
        let backup = f.executor.manager().backup_dir().join("job").join("0").join("dir");
        // The copy finished; a locked entry kept part of the source behind.
        fs::create_dir_all(src.join("locked")).unwrap();
        fs::write(src.join("locked/stuck.txt"), "stuck").unwrap();
        fs::create_dir_all(dest.join("locked")).unwrap();
        fs::write(dest.join("payload.txt"), "payload").unwrap();
        fs::write(dest.join("locked/stuck.txt"), "stuck").unwrap();
        fs::create_dir_all(backup.parent().unwrap()).unwrap();
        fs::write(&backup, "old").unwrap();

        let error = ShelfError::SourceNotRemoved {
            source_path: src.clone(),
            destination: dest.clone(),
            cause: Box::new(ShelfError::io(
                src.join("locked"),
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            )),
        };
        let item = settle_failed_transfer(src.clone(), dest.clone(), OpKind::Move, Some(backup.clone()), error);

        assert!(matches!(item.status, ItemStatus::Error { .. }));
        assert_eq!(item.created_path, Some(dest.clone()));
        assert_eq!(item.backup_path, Some(backup.clone()));
        assert_eq!(fs::read_to_string(dest.join("payload.txt")).unwrap(), "payload");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old");

        // Undo brings the data back to the source and the old file back to the target.
        let mut job = f.executor.manager().create_job(JobKind::Put);
        job.push(item);
        f.executor.manager().save_job(&job).unwrap();
        let report = f.executor.manager().undo(&job).unwrap();

        assert!(report.is_complete());
        assert_eq!(fs::read_to_string(src.join("payload.txt")).unwrap(), "payload");
        assert_eq!(fs::read_to_string(src.join("locked/stuck.txt")).unwrap(), "stuck");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
    }

    #[test]
    fn test_failed_copy_restores_displaced_destination() {
        let f = fixture(ConflictPolicy::Overwrite);
        let dest = f.target.join("x.txt");
        let backup = f.source.join("backup-x.txt");
        fs::write(&dest, "partial").unwrap();
        fs::write(&backup, "old").unwrap();

        let error = ShelfError::io(&dest, std::io::Error::from(std::io::ErrorKind::WriteZero));
        let item = settle_failed_transfer(
            f.source.join("x.txt"),
            dest.clone(),
            OpKind::Copy,
            Some(backup.clone()),
            error,
        );

        assert_eq!(item.created_path, None);
        assert_eq!(item.backup_path, None);
        assert!(!item.left_changes());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
        assert!(!backup.exists());
    }

    #[test]
    fn test_staged_item_from_path() {
        let f = fixture(ConflictPolicy::Skip);
        let staged = StagedItem::from_path(&f.source, TransferMode::Move).unwrap();
        assert_eq!(staged.kind, EntryKind::Dir);
        assert!(StagedItem::from_path(f.source.join("nope"), TransferMode::Copy).is_err());
    }
}
