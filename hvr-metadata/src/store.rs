//! Append-only store of configuration records.
//!
//! Layout: `<root>/<entity>/<entity>_<yyyyMMdd_HHmmss>.json`. Timestamps are
//! UTC, so sorting file names sorts records chronologically.

use crate::document::RecordDocument;
use crate::record::ConfigurationRecord;
use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use hvr_core::error::{HvrError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const EXTENSION: &str = "json";

/// A stored record, located but not yet loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub entity: String,
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

impl RecordEntry {
    /// File name without extension, e.g. `SQL01_20240501_020000`
    pub fn label(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of a retention pass over one entity
#[derive(Debug, Default)]
pub struct PruneReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, HvrError)>,
}

/// Rejects names that cannot be used as a single directory component
pub fn validate_entity_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HvrError::input("machine name is empty"));
    }
    if trimmed != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|'])
    {
        return Err(HvrError::input(format!(
            "'{}' cannot be used as a record directory name",
            name
        )));
    }
    Ok(())
}

/// Store rooted at a backup directory
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_dir(&self, entity: &str) -> PathBuf {
        self.root.join(entity)
    }

    /// Path a record captured at `captured_at` would be written to
    pub fn record_path(&self, entity: &str, captured_at: DateTime<Utc>) -> PathBuf {
        self.entity_dir(entity).join(format!(
            "{}_{}.{}",
            entity,
            captured_at.format(TIMESTAMP_FORMAT),
            EXTENSION
        ))
    }

    /// Write a new record.
    ///
    /// The timestamp is truncated to whole seconds. An existing file at the
    /// target path is a write conflict; it is never overwritten.
    pub fn append(&self, record: &ConfigurationRecord, captured_at: DateTime<Utc>) -> Result<PathBuf> {
        let entity = record.entity_name.as_str();
        validate_entity_name(entity)?;

        let captured_at = captured_at.trunc_subsecs(0);
        let dir = self.entity_dir(entity);
        fs::create_dir_all(&dir)
            .map_err(|e| HvrError::filesystem(e, dir.to_string_lossy(), "create_dir_all"))?;

        let path = self.record_path(entity, captured_at);
        let content = RecordDocument::new(record.clone(), captured_at).to_json()?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(HvrError::Conflict(format!(
                    "record {} already exists; refusing to overwrite",
                    path.display()
                )));
            }
            Err(e) => return Err(HvrError::filesystem(e, path.to_string_lossy(), "create")),
        };

        if let Err(e) = file.write_all(content.as_bytes()).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(HvrError::filesystem(e, path.to_string_lossy(), "write"));
        }

        debug!(entity = %entity, path = %path.display(), "record written");
        Ok(path)
    }

    /// Records of one entity, newest first.
    ///
    /// Files whose names do not follow the record pattern are ignored. An
    /// entity with no directory has no records.
    pub fn list_for(&self, entity: &str) -> Result<Vec<RecordEntry>> {
        validate_entity_name(entity)?;
        let dir = self.entity_dir(entity);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let read_dir = fs::read_dir(&dir)
            .map_err(|e| HvrError::filesystem(e, dir.to_string_lossy(), "read_dir"))?;

        let mut entries: Vec<RecordEntry> = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                parse_record_name(entity, &name).map(|captured_at| RecordEntry {
                    entity: entity.to_string(),
                    path: entry.path(),
                    captured_at,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(entries)
    }

    /// Names of every entity that has a record directory, sorted
    pub fn entities(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let read_dir = fs::read_dir(&self.root)
            .map_err(|e| HvrError::filesystem(e, self.root.to_string_lossy(), "read_dir"))?;

        let mut names: Vec<String> = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load and validate a listed record
    pub fn load(&self, entry: &RecordEntry) -> Result<RecordDocument> {
        let doc = RecordDocument::load(&entry.path)?;
        if doc.record.entity_name != entry.entity {
            return Err(HvrError::Serialization(format!(
                "Record {} describes '{}', not '{}'",
                entry.path.display(),
                doc.record.entity_name,
                entry.entity
            )));
        }
        Ok(doc)
    }

    /// Delete every record of `entity` captured strictly before `now - retention`.
    ///
    /// A failed deletion is reported and the remaining records are still
    /// evaluated.
    pub fn prune(&self, entity: &str, retention: Duration, now: DateTime<Utc>) -> Result<PruneReport> {
        let cutoff = now - retention;
        let mut report = PruneReport::default();

        for entry in self.list_for(entity)? {
            if entry.captured_at >= cutoff {
                continue;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => {
                    info!(entity = %entity, path = %entry.path.display(), "pruned expired record");
                    report.deleted.push(entry.path);
                }
                Err(e) => {
                    warn!(entity = %entity, path = %entry.path.display(), error = %e, "failed to prune record");
                    let err = HvrError::filesystem(e, entry.path.to_string_lossy(), "remove_file");
                    report.failed.push((entry.path, err));
                }
            }
        }

        Ok(report)
    }
}

fn parse_record_name(entity: &str, file_name: &str) -> Option<DateTime<Utc>> {
    let stem = file_name
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?
        .strip_prefix(entity)?
        .strip_prefix('_')?;
    NaiveDateTime::parse_from_str(stem, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
