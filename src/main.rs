//! lazyshelf - stage files, put or delete them in bulk, undo the result.
//!
//! Usage:
//!   lshelf put --target DIR PATHS...   Copy (or --move) paths into DIR
//!   lshelf delete PATHS...             Move paths into the job trash
//!   lshelf jobs                        List recent jobs
//!   lshelf undo [JOB_ID]               Undo a job (latest by default)
//!   lshelf resolve PATH                Print the absolute form of PATH
//!   lshelf --help                      Show help

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use lazyshelf_core::{ConflictPolicy, EngineConfig, ItemStatus, Job, resolve_path};
use lazyshelf_ops::{JobManager, ShelfExecutor, StagedItem, TransferMode, UndoReport};

#[derive(Parser)]
#[command(
    name = "lazyshelf",
    version,
    about = "Stage files on a shelf and apply bulk operations with undo",
    long_about = "lazyshelf copies, moves and deletes files in recorded batches.\n\n\
                  Every batch is saved as a job, and the most recent job can be \
                  undone with `lshelf undo`."
)]
struct Cli {
    /// Config root holding jobs, trash and backups
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Put paths into a target directory
    Put {
        /// Target directory
        #[arg(short, long)]
        target: String,

        /// Move instead of copy
        #[arg(short, long = "move")]
        move_items: bool,

        /// What to do when the destination exists (skip, overwrite, rename)
        #[arg(short, long)]
        policy: Option<ConflictPolicy>,

        /// Paths to put
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Move paths into the trash (reversible with undo)
    Delete {
        /// Paths to delete
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List recent jobs, newest first
    Jobs {
        /// Number of jobs to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Undo a job
    Undo {
        /// Job to undo (defaults to the most recent)
        id: Option<String>,
    },

    /// Resolve a path the way staged paths are resolved
    Resolve {
        /// Path to resolve (supports ~)
        path: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = match cli.root {
        Some(root) => resolve_path(root).context("Invalid config root")?,
        None => EngineConfig::default_root(),
    };
    let config = EngineConfig::load(root).context("Failed to load configuration")?;
    tracing::debug!(root = %config.root.display(), policy = %config.default_policy, "loaded configuration");

    match cli.command {
        Command::Put {
            target,
            move_items,
            policy,
            paths,
        } => {
            let mode = if move_items {
                TransferMode::Move
            } else {
                TransferMode::Copy
            };
            run_put(&config, &target, mode, policy.unwrap_or(config.default_policy), &paths)?;
        }
        Command::Delete { paths } => {
            run_delete(&config, &paths)?;
        }
        Command::Jobs { limit, format } => {
            run_jobs(&config, limit.unwrap_or(config.recent_limit), format)?;
        }
        Command::Undo { id } => {
            run_undo(&config, id.as_deref())?;
        }
        Command::Resolve { path } => {
            println!("{}", resolve_path(&path)?.display());
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Staged paths must not live inside the engine's own storage.
fn ensure_external(config: &EngineConfig, path: &Path) -> Result<()> {
    if config.is_internal(path) {
        color_eyre::eyre::bail!("Refusing to operate on lazyshelf storage: {}", path.display());
    }
    Ok(())
}

fn open_executor(config: &EngineConfig) -> Result<ShelfExecutor> {
    let manager = JobManager::open(config).context("Failed to open job store")?;
    Ok(ShelfExecutor::new(manager))
}

/// Put staged paths into a target directory.
fn run_put(
    config: &EngineConfig,
    target: &str,
    mode: TransferMode,
    policy: ConflictPolicy,
    paths: &[String],
) -> Result<()> {
    let target = resolve_path(target).context("Invalid target")?;
    if !target.is_dir() {
        color_eyre::eyre::bail!("Target is not a directory: {}", target.display());
    }

    let mut staged = Vec::with_capacity(paths.len());
    for path in paths {
        let path = resolve_path(path)?;
        ensure_external(config, &path)?;
        let item = StagedItem::from_path(&path, mode)
            .with_context(|| format!("Cannot stage {}", path.display()))?;
        staged.push(item);
    }

    let executor = open_executor(config)?.with_policy(policy);
    let job = executor.put(&staged, &target).context("Put failed")?;
    print_job(&job);
    Ok(())
}

/// Delete paths through the trash.
fn run_delete(config: &EngineConfig, paths: &[String]) -> Result<()> {
    let paths = paths
        .iter()
        .map(resolve_path)
        .collect::<Result<Vec<_>, _>>()?;
    for path in &paths {
        ensure_external(config, path)?;
    }

    let executor = open_executor(config)?;
    let job = executor.delete(&paths).context("Delete failed")?;
    print_job(&job);
    Ok(())
}

/// List recent jobs.
fn run_jobs(config: &EngineConfig, limit: usize, format: OutputFormat) -> Result<()> {
    let manager = JobManager::open(config).context("Failed to open job store")?;
    let jobs = manager.recent_jobs(limit)?;

    match format {
        OutputFormat::Text => {
            if jobs.is_empty() {
                println!("No jobs recorded.");
            }
            for job in &jobs {
                let (ok, skipped, failed) = job.tally();
                println!(
                    "{}  {:<6}  {}  {} ok, {} skipped, {} failed",
                    job.id,
                    job.kind,
                    job.created_at.format("%Y-%m-%d %H:%M:%S"),
                    ok,
                    skipped,
                    failed
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
    }

    Ok(())
}

/// Undo the given job, or the most recent one.
fn run_undo(config: &EngineConfig, id: Option<&str>) -> Result<()> {
    let manager = JobManager::open(config).context("Failed to open job store")?;

    let report = match id {
        Some(id) => {
            let job = manager.load_job(id)?;
            Some(manager.undo(&job)?)
        }
        None => manager.undo_latest()?,
    };

    match report {
        Some(report) => print_undo(&report),
        None => println!("Nothing to undo."),
    }
    Ok(())
}

fn print_job(job: &Job) {
    for item in &job.items {
        match &item.status {
            ItemStatus::Ok => {
                let target = item
                    .created_path
                    .as_ref()
                    .or(item.trash_path.as_ref())
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!(" {:<6} {} -> {}", item.op, item.src.display(), target);
            }
            ItemStatus::Skipped => println!(" skip   {}", item.src.display()),
            ItemStatus::Error { error } => eprintln!(" error  {}: {}", item.src.display(), error),
        }
    }

    let (ok, skipped, failed) = job.tally();
    println!("Job {}: {} ok, {} skipped, {} failed", job.id, ok, skipped, failed);
}

fn print_undo(report: &UndoReport) {
    for failure in &report.failures {
        eprintln!(" error  {}: {}", failure.source.display(), failure.error);
    }
    println!(
        "Undid job {}: {} restored, {} failed",
        report.job_id,
        report.restored,
        report.failures.len()
    );
}
