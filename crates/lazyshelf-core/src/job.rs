//! Job log types.
//!
//! A [`Job`] is one batch of file operations sharing a single user action,
//! recorded with enough detail that every successful [`JobItem`] can be
//! reversed later. Jobs are written once, read any number of times and
//! deleted once undone.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a job did as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobKind {
    /// Copy or move shelf items into a target directory.
    Put,
    /// Move shelf items into the trash.
    Delete,
}

/// The primitive operation behind a job item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OpKind {
    Copy,
    Move,
    Delete,
}

/// Outcome of a job item.
///
/// The error message lives inside [`ItemStatus::Error`], so a message is
/// present exactly when the item failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemStatus {
    Ok,
    Skipped,
    Error { error: String },
}

impl ItemStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// The stored error message, if the item failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Policy applied when an operation's destination already exists.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave the existing destination alone and skip the item.
    #[default]
    Skip,
    /// Replace an existing file (never a directory).
    Overwrite,
    /// Pick the first free "name (n).ext" sibling.
    Rename,
}

/// One reversible unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobItem {
    pub src: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<PathBuf>,
    pub op: OpKind,
    #[serde(flatten)]
    pub status: ItemStatus,
    /// Path this item caused to exist (copy/move target).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_path: Option<PathBuf>,
    /// Where an overwritten destination was relocated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Where a deleted source was relocated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_path: Option<PathBuf>,
}

impl JobItem {
    fn new(src: PathBuf, dst: Option<PathBuf>, op: OpKind, status: ItemStatus) -> Self {
        Self {
            src,
            dst,
            op,
            status,
            created_path: None,
            backup_path: None,
            trash_path: None,
        }
    }

    /// A successful copy or move that created `created`.
    pub fn transferred(src: PathBuf, created: PathBuf, op: OpKind) -> Self {
        let mut item = Self::new(src, Some(created.clone()), op, ItemStatus::Ok);
        item.created_path = Some(created);
        item
    }

    /// A successful delete that relocated `src` to `trash`.
    pub fn trashed(src: PathBuf, trash: PathBuf) -> Self {
        let mut item = Self::new(src, None, OpKind::Delete, ItemStatus::Ok);
        item.trash_path = Some(trash);
        item
    }

    /// An item left alone because of the conflict policy.
    pub fn skipped(src: PathBuf, dst: PathBuf, op: OpKind) -> Self {
        Self::new(src, Some(dst), op, ItemStatus::Skipped)
    }

    /// A failed item. The error is stringified here, at the persistence boundary.
    pub fn failed(
        src: PathBuf,
        dst: Option<PathBuf>,
        op: OpKind,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::new(
            src,
            dst,
            op,
            ItemStatus::Error {
                error: error.to_string(),
            },
        )
    }

    /// Attach the backup of a displaced destination.
    pub fn with_backup(mut self, backup: Option<PathBuf>) -> Self {
        self.backup_path = backup;
        self
    }

    /// Record a path the item created even though it failed.
    pub fn with_created(mut self, created: Option<PathBuf>) -> Self {
        self.created_path = created;
        self
    }

    /// Record a trash entry the item produced even though it failed.
    pub fn with_trash(mut self, trash: Option<PathBuf>) -> Self {
        self.trash_path = trash;
        self
    }

    /// Whether undo has anything to reverse for this item.
    ///
    /// True for every successful item, and for failed items that still
    /// record a path they left changed on disk.
    pub fn left_changes(&self) -> bool {
        self.status.is_ok()
            || self.created_path.is_some()
            || self.backup_path.is_some()
            || self.trash_path.is_some()
    }
}

/// An ordered batch of job items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<JobItem>,
}

impl Job {
    /// Create an empty job with a fresh identifier.
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    /// Append an item; insertion order is execution order.
    pub fn push(&mut self, item: JobItem) {
        self.items.push(item);
    }

    /// Name of the persisted record for this job.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }

    /// Sources whose move succeeded; these no longer belong on the shelf.
    pub fn moved_sources(&self) -> impl Iterator<Item = &Path> {
        self.items
            .iter()
            .filter(|item| item.op == OpKind::Move && item.status.is_ok())
            .map(|item| item.src.as_path())
    }

    /// Counts of (ok, skipped, failed) items.
    pub fn tally(&self) -> (usize, usize, usize) {
        self.items
            .iter()
            .fold((0, 0, 0), |(ok, skipped, failed), item| match item.status {
                ItemStatus::Ok => (ok + 1, skipped, failed),
                ItemStatus::Skipped => (ok, skipped + 1, failed),
                ItemStatus::Error { .. } => (ok, skipped, failed + 1),
            })
    }
}
