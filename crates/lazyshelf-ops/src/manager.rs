//! Job persistence, listing and undo.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lazyshelf_core::{EngineConfig, Job, JobKind, Result, ShelfError};

use crate::undo::{UndoReport, replay_reverse};

/// Creates, stores and reverses jobs.
///
/// Each job is persisted once as `<jobs_dir>/<id>.json` and removed again
/// after it has been undone.
#[derive(Debug, Clone)]
pub struct JobManager {
    jobs_dir: PathBuf,
    trash_dir: PathBuf,
    backup_dir: PathBuf,
}

impl JobManager {
    /// Open the job store described by `config`, creating the jobs directory.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let jobs_dir = config.jobs_dir();
        fs::create_dir_all(&jobs_dir).map_err(|e| ShelfError::io(&jobs_dir, e))?;

        Ok(Self {
            jobs_dir,
            trash_dir: config.trash_dir(),
            backup_dir: config.backup_dir(),
        })
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Allocate an empty job. Nothing is written until [`save_job`](Self::save_job).
    pub fn create_job(&self, kind: JobKind) -> Job {
        Job::new(kind)
    }

    /// Write `job` to its record file, replacing any previous record.
    pub fn save_job(&self, job: &Job) -> Result<()> {
        let path = self.record_path(&job.id)?;
        let data = serde_json::to_string_pretty(job)?;
        fs::write(&path, data).map_err(|e| ShelfError::io(&path, e))?;

        tracing::info!(job = %job.id, kind = %job.kind, items = job.items.len(), "saved job");
        Ok(())
    }

    /// The `n` most recent jobs, newest first.
    ///
    /// Records that cannot be read or parsed are skipped so one corrupt
    /// file does not hide the others.
    pub fn recent_jobs(&self, n: usize) -> Result<Vec<Job>> {
        let entries = match fs::read_dir(&self.jobs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ShelfError::io(&self.jobs_dir, e)),
        };

        let mut jobs: Vec<Job> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| match read_record(&path) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable job record");
                    None
                }
            })
            .collect();

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(n);
        Ok(jobs)
    }

    /// Load the persisted job with identifier `id`.
    pub fn load_job(&self, id: &str) -> Result<Job> {
        let path = self.record_path(id)?;
        match read_record(&path) {
            Err(e) if e.is_not_found() => Err(ShelfError::JobNotFound { id: id.to_string() }),
            other => other,
        }
    }

    /// Reverse `job` and delete its record.
    ///
    /// Items are replayed newest first and per-item failures are collected
    /// in the report rather than aborting. The record is deleted even when
    /// some items could not be restored, so a job is never undone twice.
    pub fn undo(&self, job: &Job) -> Result<UndoReport> {
        let path = self.record_path(&job.id)?;
        if !path.exists() {
            return Err(ShelfError::JobNotFound { id: job.id.clone() });
        }

        let report = replay_reverse(job);

        fs::remove_file(&path).map_err(|e| ShelfError::io(&path, e))?;
        tracing::info!(
            job = %job.id,
            restored = report.restored,
            failed = report.failures.len(),
            "undid job"
        );
        Ok(report)
    }

    /// Undo the most recent job, if there is one.
    pub fn undo_latest(&self) -> Result<Option<UndoReport>> {
        match self.recent_jobs(1)?.into_iter().next() {
            Some(job) => self.undo(&job).map(Some),
            None => Ok(None),
        }
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\']);
        if !valid {
            return Err(ShelfError::JobNotFound { id: id.to_string() });
        }
        Ok(self.jobs_dir.join(format!("{id}.json")))
    }
}

fn read_record(path: &Path) -> Result<Job> {
    let data = fs::read_to_string(path).map_err(|e| ShelfError::io(path, e))?;
    Ok(serde_json::from_str(&data)?)
}
