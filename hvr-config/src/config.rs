use hvr_core::error::{HvrError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Top-level configuration file (`config.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HvrConfig {
    pub storage: StorageSettings,
    pub backup: BackupSettings,
    pub restore: RestoreSettings,

    /// File this configuration was read from, if any
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Connection to the storage controller's management endpoint.
///
/// The password is deliberately absent; it is supplied at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSettings {
    /// Base URL of the management interface, e.g. `https://cluster01-mgmt`
    pub endpoint: String,
    pub username: String,
    /// SVM that owns new shares. Omitted from requests when unset.
    pub svm: Option<String>,
    /// Root under which shares are reachable as paths, e.g. `\\cifs01`
    pub share_root: String,
    /// Skip TLS certificate validation. Non-production use only.
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: "admin".to_string(),
            svm: None,
            share_root: String::new(),
            accept_invalid_certs: false,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BackupSettings {
    /// Directory holding one sub-directory of records per machine
    pub root: PathBuf,
    pub retention_days: u32,
    /// Cluster group whose owner is the single capture writer
    pub coordination_group: String,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(r"C:\ClusterStorage\Volume1\VMConfigBackups"),
            retention_days: 30,
            coordination_group: "Cluster Group".to_string(),
        }
    }
}

/// What to do when the restore target name is already taken
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    /// Append a timestamp to the target name
    #[default]
    Disambiguate,
    /// Fail before touching the hypervisor
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RestoreSettings {
    pub name_suffix: String,
    pub on_existing: ExistingPolicy,
    /// File extensions (without dot) that count as virtual disks in a clone
    pub disk_extensions: Vec<String>,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            name_suffix: "_Restored".to_string(),
            on_existing: ExistingPolicy::Disambiguate,
            disk_extensions: vec!["vhdx".into(), "vhd".into(), "avhdx".into()],
        }
    }
}

impl RestoreSettings {
    /// Case-insensitive check of a file name against `disk_extensions`
    pub fn is_disk_file(&self, file_name: &str) -> bool {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .disk_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}

impl HvrConfig {
    /// Checks that apply to every command
    pub fn validate(&self) -> Result<()> {
        if self.backup.retention_days == 0 {
            return Err(HvrError::Config(
                "backup.retention_days must be at least 1".into(),
            ));
        }
        if self.restore.disk_extensions.is_empty() {
            return Err(HvrError::Config(
                "restore.disk_extensions must list at least one extension".into(),
            ));
        }
        if self.storage.accept_invalid_certs {
            warn!(
                endpoint = %self.storage.endpoint,
                "storage certificate validation is disabled"
            );
        }
        Ok(())
    }

    /// Checks needed before talking to the storage controller
    pub fn validate_storage(&self) -> Result<()> {
        let endpoint = self.storage.endpoint.trim();
        if endpoint.is_empty() {
            return Err(HvrError::Config(
                "storage.endpoint is not set (config file or HVR_STORAGE_ENDPOINT)".into(),
            ));
        }
        let parsed = url::Url::parse(endpoint).map_err(|e| {
            HvrError::Config(format!("storage.endpoint '{}' is not a URL: {}", endpoint, e))
        })?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(HvrError::Config(format!(
                "storage.endpoint must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if self.storage.share_root.trim().is_empty() {
            return Err(HvrError::Config(
                "storage.share_root is not set; clones cannot be located".into(),
            ));
        }
        Ok(())
    }
}
