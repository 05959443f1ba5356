//! Core types for lazyshelf.
//!
//! This crate provides the job log data model, the shared error type,
//! engine configuration and the user-facing path resolver used by the
//! operations engine and the command-line front end.

mod config;
mod error;
mod job;
mod paths;

pub use config::{CONFIG_FILE_NAME, EngineConfig, EngineConfigBuilder};
pub use error::{Result, ShelfError};
pub use job::{ConflictPolicy, ItemStatus, Job, JobItem, JobKind, OpKind};
pub use paths::resolve_path;
