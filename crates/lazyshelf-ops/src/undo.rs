//! Reversal of recorded job items.

use std::path::PathBuf;

use lazyshelf_core::{Job, JobItem, OpKind, Result, ShelfError};

use crate::move_op::{move_path, remove_path};

/// An item whose reversal failed.
#[derive(Debug)]
pub struct UndoFailure {
    /// Source path of the item that could not be restored.
    pub source: PathBuf,
    pub error: ShelfError,
}

/// Summary of an undo pass.
#[derive(Debug)]
pub struct UndoReport {
    pub job_id: String,
    /// Items reversed without error.
    pub restored: usize,
    /// Items whose reversal failed, in the order they were attempted.
    pub failures: Vec<UndoFailure>,
}

impl UndoReport {
    /// Whether every successful item of the job was reversed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reverse the items of `job` that left changes behind, newest first.
///
/// Failures are logged and collected; the walk always visits every item.
pub(crate) fn replay_reverse(job: &Job) -> UndoReport {
    let mut report = UndoReport {
        job_id: job.id.clone(),
        restored: 0,
        failures: Vec::new(),
    };

    for item in job.items.iter().rev().filter(|item| item.left_changes()) {
        let errors = undo_item(item);
        if errors.is_empty() {
            report.restored += 1;
            continue;
        }
        for error in errors {
            tracing::warn!(
                job = %job.id,
                source = %item.src.display(),
                error = %error,
                "undo failed for item"
            );
            report.failures.push(UndoFailure {
                source: item.src.clone(),
                error,
            });
        }
    }

    report
}

/// Reverse one item: the operation itself, then any displaced destination.
///
/// Returns every error hit along the way.
fn undo_item(item: &JobItem) -> Vec<ShelfError> {
    let mut errors = Vec::new();

    if let Err(e) = reverse_operation(item) {
        errors.push(e);
        // The moved data still sits at the destination; clearing it for the
        // backup would destroy the only copy.
        if item.op == OpKind::Move && item.backup_path.is_some() {
            tracing::warn!(
                source = %item.src.display(),
                backup = ?item.backup_path,
                "move not reversed, leaving backup in place"
            );
            return errors;
        }
    }

    if let Err(e) = restore_backup(item) {
        errors.push(e);
    }
    errors
}

fn reverse_operation(item: &JobItem) -> Result<()> {
    match item.op {
        // Undoing a copy deletes what it created.
        OpKind::Copy => match &item.created_path {
            Some(created) => remove_path(created),
            None => Ok(()),
        },
        OpKind::Move => match &item.created_path {
            Some(created) => move_path(created, &item.src),
            None => Ok(()),
        },
        OpKind::Delete => match &item.trash_path {
            Some(trash) => move_path(trash, &item.src),
            None => Ok(()),
        },
    }
}

fn restore_backup(item: &JobItem) -> Result<()> {
    let (Some(backup), Some(dst)) = (&item.backup_path, &item.dst) else {
        return Ok(());
    };
    remove_path(dst)?;
    move_path(backup, dst)
}
