use crate::config::HvrConfig;
use hvr_core::error::{HvrError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds and loads `config.yaml`.
///
/// Priority chain:
/// 1. An explicit path (`--config`). It must exist.
/// 2. `HVR_CONFIG`. It must exist.
/// 3. `<config dir>/hvrestore/config.yaml`. Missing means built-in defaults.
///
/// `HVR_STORAGE_ENDPOINT`, `HVR_STORAGE_USERNAME` and `HVR_BACKUP_ROOT`
/// override the corresponding file values.
#[derive(Default)]
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    pub fn load(&self) -> Result<HvrConfig> {
        let mut config = match self.resolve_path()? {
            Some(path) => Self::load_file(&path)?,
            None => HvrConfig::default(),
        };
        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// The file that `load` reads, or `None` when defaults apply
    pub fn resolve_path(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.explicit {
            return Self::require(path).map(Some);
        }

        if let Ok(from_env) = env::var("HVR_CONFIG") {
            if !from_env.trim().is_empty() {
                return Self::require(Path::new(&from_env)).map(Some);
            }
        }

        let default = hvr_core::paths::default_config_file()?;
        if default.exists() {
            Ok(Some(default))
        } else {
            debug!(path = %default.display(), "no configuration file, using defaults");
            Ok(None)
        }
    }

    fn require(path: &Path) -> Result<PathBuf> {
        if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(HvrError::Config(format!(
                "Configuration file {} does not exist",
                path.display()
            )))
        }
    }

    pub fn load_file(path: &Path) -> Result<HvrConfig> {
        debug!(path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .map_err(|e| HvrError::filesystem(e, path.to_string_lossy(), "read"))?;

        let mut config: HvrConfig = if contents.trim().is_empty() {
            HvrConfig::default()
        } else {
            serde_yaml_ng::from_str(&contents).map_err(|e| {
                HvrError::Config(format!("Invalid configuration in {}: {}", path.display(), e))
            })?
        };
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn apply_env_overrides(config: &mut HvrConfig) {
        if let Ok(endpoint) = env::var("HVR_STORAGE_ENDPOINT") {
            config.storage.endpoint = endpoint;
        }
        if let Ok(username) = env::var("HVR_STORAGE_USERNAME") {
            config.storage.username = username;
        }
        if let Ok(root) = env::var("HVR_BACKUP_ROOT") {
            config.backup.root = PathBuf::from(root);
        }
    }
}
