//! Engine configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShelfError};
use crate::job::ConflictPolicy;

/// Name of the optional configuration file inside the config root.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration for the operations engine.
///
/// Everything the engine persists lives below `root`: job records in
/// `jobs/`, deleted items in `trash/` and overwritten files in `backups/`.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Config root directory.
    #[builder(default = "EngineConfig::default_root()")]
    #[serde(default = "EngineConfig::default_root")]
    pub root: PathBuf,

    /// Conflict policy used for puts when the caller does not choose one.
    #[builder(default)]
    #[serde(default)]
    pub default_policy: ConflictPolicy,

    /// How many jobs `jobs` listings show by default.
    #[builder(default = "10")]
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    10
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Config root cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Create a config rooted at `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_policy: ConflictPolicy::default(),
            recent_limit: default_recent_limit(),
        }
    }

    /// The platform config directory, e.g. `~/.config/lazyshelf`.
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lazyshelf")
    }

    /// Load `config.toml` from `root`, falling back to defaults when absent.
    ///
    /// The root always comes from the argument, never from the file.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Self>(&content).map_err(|e| {
                ShelfError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(&root),
            Err(e) => return Err(ShelfError::io(&path, e)),
        };
        config.root = root;
        Ok(config)
    }

    /// Write this config to `<root>/config.toml`.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| ShelfError::io(&self.root, e))?;
        let path = self.root.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self).map_err(|e| {
            ShelfError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        std::fs::write(&path, content).map_err(|e| ShelfError::io(&path, e))
    }

    /// Directory holding one JSON record per job.
    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    /// Root of the per-job trash directories.
    pub fn trash_dir(&self) -> PathBuf {
        self.root.join("trash")
    }

    /// Root of the per-job backups of overwritten destinations.
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Whether `path` lies inside the engine's own storage.
    pub fn is_internal(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .root("/tmp/shelf")
            .default_policy(ConflictPolicy::Rename)
            .recent_limit(3usize)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/tmp/shelf"));
        assert_eq!(config.default_policy, ConflictPolicy::Rename);
        assert_eq!(config.recent_limit, 3);
    }

    #[test]
    fn test_builder_rejects_empty_root() {
        assert!(EngineConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_derived_dirs() {
        let config = EngineConfig::new("/cfg");
        assert_eq!(config.jobs_dir(), PathBuf::from("/cfg/jobs"));
        assert_eq!(config.trash_dir(), PathBuf::from("/cfg/trash"));
        assert_eq!(config.backup_dir(), PathBuf::from("/cfg/backups"));
        assert!(config.is_internal(Path::new("/cfg/trash/x")));
        assert!(!config.is_internal(Path::new("/elsewhere")));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(config, EngineConfig::new(dir.path()));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = EngineConfig::new(dir.path());
        config.default_policy = ConflictPolicy::Overwrite;
        config.recent_limit = 25;
        config.save().unwrap();

        let loaded = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "default_policy = \"rename\"\n").unwrap();

        let config = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(config.default_policy, ConflictPolicy::Rename);
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "default_policy = 7").unwrap();
        assert!(EngineConfig::load(dir.path()).is_err());
    }
}
