//! File operations engine for lazyshelf.
//!
//! This crate executes copy, move and delete against the real filesystem,
//! resolves destination conflicts, records every batch as a job log and
//! reverses a job on demand. Everything runs synchronously on the caller's
//! thread.

mod conflict;
mod copy;
mod executor;
mod manager;
mod move_op;
mod trash;
mod undo;

pub use conflict::{MAX_RENAME_ATTEMPTS, Resolution, free_name, path_exists, resolve_conflict};
pub use copy::{copy_file, copy_tree};
pub use executor::{EntryKind, ShelfExecutor, StagedItem, TransferMode};
pub use manager::JobManager;
pub use move_op::{move_path, remove_path};
pub use trash::{delete_to_trash, trash_path};
pub use undo::{UndoFailure, UndoReport};
