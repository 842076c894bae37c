//! Restore state machine.
//!
//! `SelectRecord → SelectSnapshot → Provisioning → Validating →
//! Reconstructing → Complete`, with `CleaningUp` on request. A failure stops
//! forward progress where it happened; whatever storage was provisioned stays
//! in the session's [`CloneHandle`] so it can be cleaned up or reported.

use crate::cleanup::{cleanup, CleanupReport};
use crate::selector::{checked_index, SelectionItem, Selector};
use chrono::{DateTime, Utc};
use hvr_config::{ExistingPolicy, RestoreSettings};
use hvr_core::error::{HvrError, Result};
use hvr_core::hvr_println;
use hvr_hypervisor::Hypervisor;
use hvr_messages::{msg, MESSAGES};
use hvr_metadata::{validate_entity_name, ConfigurationRecord, DiskSpec, MetadataStore};
use hvr_storage::{
    clone_name, eligible_snapshots, junction_path, mount_path, share_name, CloneId, ShareId,
    StorageApi, StorageSnapshot,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SelectRecord,
    SelectSnapshot,
    Provisioning,
    Validating,
    Reconstructing,
    Complete,
    CleaningUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SelectRecord => "record selection",
            Stage::SelectSnapshot => "snapshot selection",
            Stage::Provisioning => "provisioning",
            Stage::Validating => "clone validation",
            Stage::Reconstructing => "machine reconstruction",
            Stage::Complete => "complete",
            Stage::CleaningUp => "cleanup",
        };
        f.write_str(name)
    }
}

/// Storage this process provisioned. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneHandle {
    pub clone: CloneId,
    /// Derived from the clone name, so it is known before the share exists
    pub share_name: String,
    /// `None` until share creation returned
    pub share: Option<ShareId>,
    pub mount_path: PathBuf,
}

impl CloneHandle {
    pub fn clone_name(&self) -> &str {
        &self.clone.name
    }
}

#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Machine whose records are restored
    pub entity: String,
    /// Volume the machine's data lives on now
    pub volume: String,
}

#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub entity: String,
    pub target: String,
    pub record: String,
    pub snapshot: String,
    pub handle: CloneHandle,
    /// Items that could not be applied; the restore still succeeded
    pub warnings: Vec<String>,
}

/// Progress of one restore, owned by the caller so the clone handle
/// outlives a failed run
#[derive(Debug)]
pub struct RestoreSession {
    stage: Stage,
    handle: Option<CloneHandle>,
    /// Clone requested from storage but not confirmed yet
    pending_clone: Option<String>,
    warnings: Vec<String>,
}

impl Default for RestoreSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RestoreSession {
    pub fn new() -> Self {
        Self {
            stage: Stage::SelectRecord,
            handle: None,
            pending_clone: None,
            warnings: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn handle(&self) -> Option<&CloneHandle> {
        self.handle.as_ref()
    }

    /// Name of a clone whose creation failed or went unconfirmed. The
    /// controller may still have made it, so it is reported for cleanup.
    pub fn pending_clone(&self) -> Option<&str> {
        self.pending_clone.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn enter(&mut self, stage: Stage) {
        debug!(stage = %stage, "restore stage");
        self.stage = stage;
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

pub struct RestoreOrchestrator<'a> {
    store: &'a MetadataStore,
    storage: &'a dyn StorageApi,
    hypervisor: &'a dyn Hypervisor,
    settings: RestoreSettings,
    share_root: String,
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(
        store: &'a MetadataStore,
        storage: &'a dyn StorageApi,
        hypervisor: &'a dyn Hypervisor,
        settings: RestoreSettings,
        share_root: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            hypervisor,
            settings,
            share_root: share_root.into(),
        }
    }

    /// Run a restore up to `Complete`.
    ///
    /// On error, `session.stage()` is where it stopped and `session.handle()`
    /// holds any clone and share that were already created.
    pub fn run(
        &self,
        request: &RestoreRequest,
        selector: &mut dyn Selector,
        session: &mut RestoreSession,
    ) -> Result<RestoreOutcome> {
        session.enter(Stage::SelectRecord);
        let (record_label, record) = self.select_record(&request.entity, selector)?;

        session.enter(Stage::SelectSnapshot);
        let snapshot = self.select_snapshot(&request.volume, selector)?;

        session.enter(Stage::Provisioning);
        self.provision(&snapshot, session)?;
        let handle = session
            .handle
            .clone()
            .ok_or_else(|| HvrError::Internal("provisioning left no clone handle".into()))?;

        session.enter(Stage::Validating);
        let disk_files = self.validate_clone(&handle.mount_path, &record.entity_name)?;

        session.enter(Stage::Reconstructing);
        let target = self.reconstruct(&record, &disk_files, session)?;

        session.enter(Stage::Complete);
        info!(entity = %record.entity_name, machine = %target, clone = %handle.clone.name, "restore complete");
        Ok(RestoreOutcome {
            entity: record.entity_name,
            target,
            record: record_label,
            snapshot: snapshot.name,
            handle,
            warnings: session.warnings.clone(),
        })
    }

    /// Delete the session's share and clone. The handle is dropped only when
    /// both are gone.
    pub fn cleanup(&self, session: &mut RestoreSession) -> Option<CleanupReport> {
        let handle = session.handle.clone()?;
        session.enter(Stage::CleaningUp);
        let report = cleanup(self.storage, &handle);
        if report.is_clean() {
            session.handle = None;
        }
        Some(report)
    }

    fn select_record(
        &self,
        entity: &str,
        selector: &mut dyn Selector,
    ) -> Result<(String, ConfigurationRecord)> {
        validate_entity_name(entity)?;
        let entries = self.store.list_for(entity)?;
        if entries.is_empty() {
            return Err(HvrError::input(format!(
                "no configuration records for '{}' under {}",
                entity,
                self.store.root().display()
            )));
        }

        let items: Vec<SelectionItem> = entries
            .iter()
            .map(|e| {
                SelectionItem::new(
                    e.label(),
                    format!("{}  ({})", e.label(), e.captured_at.format("%Y-%m-%d %H:%M:%S UTC")),
                )
            })
            .collect();
        let prompt = msg!(MESSAGES.restore.prompt_record, entity = entity);
        let index = checked_index(selector.choose(&prompt, &items)?, &items)?;

        let entry = &entries[index];
        let doc = self.store.load(entry)?;
        info!(entity = %entity, record = %entry.path.display(), "record selected");
        Ok((entry.label(), doc.record))
    }

    fn select_snapshot(&self, volume: &str, selector: &mut dyn Selector) -> Result<StorageSnapshot> {
        let volume_id = self.storage.find_volume(volume).map_err(|e| match e {
            HvrError::NotFound(_) => HvrError::input(format!("volume '{}' was not found", volume)),
            other => other,
        })?;

        let mut snapshots = eligible_snapshots(self.storage.list_snapshots(&volume_id)?);
        if snapshots.is_empty() {
            return Err(HvrError::input(format!(
                "volume '{}' has no restorable snapshots",
                volume
            )));
        }
        snapshots.sort_by(|a, b| b.create_time.cmp(&a.create_time));

        let items: Vec<SelectionItem> = snapshots
            .iter()
            .map(|s| {
                SelectionItem::new(
                    s.name.clone(),
                    format!("{}  ({})", s.name, s.create_time.format("%Y-%m-%d %H:%M:%S UTC")),
                )
            })
            .collect();
        let prompt = msg!(MESSAGES.restore.prompt_snapshot, volume = volume);
        let index = checked_index(selector.choose(&prompt, &items)?, &items)?;

        let snapshot = snapshots.swap_remove(index);
        info!(volume = %volume, snapshot = %snapshot.name, "snapshot selected");
        Ok(snapshot)
    }

    fn provision(&self, snapshot: &StorageSnapshot, session: &mut RestoreSession) -> Result<()> {
        let name = clone_name(&snapshot.volume.name, Utc::now());
        session.pending_clone = Some(name.clone());
        let clone = self.storage.create_clone(&name, &snapshot.volume, snapshot)?;
        session.pending_clone = None;

        let share = share_name(&clone.name);
        session.handle = Some(CloneHandle {
            share_name: share.clone(),
            share: None,
            mount_path: mount_path(&self.share_root, &share),
            clone: clone.clone(),
        });
        info!(clone = %clone, snapshot = %snapshot.name, "clone created");
        hvr_println!(
            "{}",
            msg!(MESSAGES.restore.clone_created, clone = &clone.name, snapshot = &snapshot.name)
        );

        let share_id = self.storage.create_share(&share, &junction_path(&clone.name))?;
        if let Some(handle) = session.handle.as_mut() {
            handle.share = Some(share_id.clone());
            info!(share = %share_id, path = %handle.mount_path.display(), "share created");
            hvr_println!(
                "{}",
                msg!(
                    MESSAGES.restore.share_created,
                    share = &share,
                    path = handle.mount_path.display()
                )
            );
        }
        Ok(())
    }

    /// Check the clone holds `<entity>/` with at least one disk file under it.
    /// Returns every disk file in the clone, entity folder first.
    fn validate_clone(&self, mount: &Path, entity: &str) -> Result<CloneFiles> {
        if !mount.is_dir() {
            return Err(HvrError::Validation(format!(
                "share path {} is not reachable",
                mount.display()
            )));
        }

        let entity_dir = find_child_dir(mount, entity).ok_or_else(|| {
            HvrError::Validation(format!(
                "no folder named '{}' in {}; check the volume and snapshot",
                entity,
                mount.display()
            ))
        })?;

        let entity_disks = self.disk_files(&entity_dir);
        if entity_disks.is_empty() {
            return Err(HvrError::Validation(format!(
                "no virtual disk files under {}",
                entity_dir.display()
            )));
        }
        hvr_println!(
            "{}",
            msg!(MESSAGES.restore.validated, count = entity_disks.len(), entity = entity)
        );

        let all_disks = self.disk_files(mount);
        Ok(CloneFiles {
            entity_disks,
            all_disks,
        })
    }

    fn disk_files(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.settings.is_disk_file(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// `<entity><suffix>`, or with a timestamp when taken. Never a name that exists.
    fn target_name(&self, entity: &str, now: DateTime<Utc>) -> Result<String> {
        let base = format!("{}{}", entity, self.settings.name_suffix);
        if !self.hypervisor.vm_exists(&base)? {
            return Ok(base);
        }
        if self.settings.on_existing == ExistingPolicy::Abort {
            return Err(HvrError::Conflict(format!(
                "a machine named '{}' already exists",
                base
            )));
        }
        let candidate = format!("{}_{}", base, now.format("%Y%m%d_%H%M%S"));
        if self.hypervisor.vm_exists(&candidate)? {
            return Err(HvrError::Conflict(format!(
                "machines named '{}' and '{}' already exist",
                base, candidate
            )));
        }
        hvr_println!(
            "{}",
            msg!(MESSAGES.restore.target_renamed, name = &base, target = &candidate)
        );
        Ok(candidate)
    }

    fn reconstruct(
        &self,
        record: &ConfigurationRecord,
        files: &CloneFiles,
        session: &mut RestoreSession,
    ) -> Result<String> {
        let target = self.target_name(&record.entity_name, Utc::now())?;
        let hv = self.hypervisor;

        hv.create_vm(&target, record.generation, record.memory.startup_bytes())?;
        info!(machine = %target, generation = record.generation, "machine created");
        hv.set_processor_count(&target, record.cpu_count)?;
        hv.set_memory(&target, &record.memory)?;

        if let Err(e) = hv.remove_network_adapters(&target) {
            session.warn(format!("could not remove the default network adapter: {}", e));
        }

        for adapter in &record.network_adapters {
            if let Err(e) =
                hv.add_network_adapter(&target, &adapter.name, adapter.switch_name.as_deref())
            {
                session.warn(format!("adapter '{}' was not added: {}", adapter.name, e));
                continue;
            }
            if let Some(mac) = &adapter.mac_address {
                if let Err(e) = hv.set_adapter_mac(&target, &adapter.name, mac) {
                    session.warn(format!("adapter '{}' keeps a dynamic MAC: {}", adapter.name, e));
                }
            }
            if !adapter.vlan.is_none() {
                if let Err(e) = hv.set_adapter_vlan(&target, &adapter.name, &adapter.vlan) {
                    session.warn(format!(
                        "adapter '{}' VLAN ({}) was not applied: {}",
                        adapter.name, adapter.vlan, e
                    ));
                }
            }
        }

        for disk in &record.disks {
            let Some(path) = resolve_disk(disk, files) else {
                session.warn(format!(
                    "disk '{}' was not found in the clone and was not attached",
                    disk.path
                ));
                continue;
            };
            let path = path.to_string_lossy();
            match hv.add_hard_disk(&target, &path, disk.controller, disk.address) {
                Ok(()) => debug!(
                    machine = %target,
                    disk = %path,
                    controller = %disk.controller,
                    channel = disk.address.channel,
                    slot = disk.address.slot,
                    "disk attached"
                ),
                Err(e) => session.warn(format!("disk '{}' was not attached: {}", path, e)),
            }
        }

        Ok(target)
    }
}

/// Disk files found in a clone
#[derive(Debug, Default)]
struct CloneFiles {
    entity_disks: Vec<PathBuf>,
    all_disks: Vec<PathBuf>,
}

fn find_child_dir(parent: &Path, name: &str) -> Option<PathBuf> {
    let exact = parent.join(name);
    if exact.is_dir() {
        return Some(exact);
    }
    // Share paths are case-insensitive on the storage side.
    std::fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.path().is_dir() && entry.file_name().to_string_lossy().eq_ignore_ascii_case(name)
        })
        .map(|entry| entry.path())
}

/// Leaf-name match under the entity folder first, then anywhere in the clone
fn resolve_disk(disk: &DiskSpec, files: &CloneFiles) -> Option<PathBuf> {
    let leaf = disk.leaf_name()?;
    let matches = |path: &&PathBuf| {
        path.file_name()
            .map(|name| name.to_string_lossy().eq_ignore_ascii_case(leaf))
            .unwrap_or(false)
    };
    files
        .entity_disks
        .iter()
        .find(matches)
        .or_else(|| files.all_disks.iter().find(matches))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvr_metadata::{ControllerAddress, ControllerKind};

    fn disk(path: &str) -> DiskSpec {
        DiskSpec {
            controller: ControllerKind::Scsi,
            address: ControllerAddress { channel: 0, slot: 0 },
            path: path.to_string(),
        }
    }

    #[test]
    fn entity_folder_wins_over_the_rest_of_the_clone() {
        let files = CloneFiles {
            entity_disks: vec![PathBuf::from("/m/X/Virtual Hard Disks/Y.vhdx")],
            all_disks: vec![
                PathBuf::from("/m/Old/Y.vhdx"),
                PathBuf::from("/m/X/Virtual Hard Disks/Y.vhdx"),
            ],
        };
        assert_eq!(
            resolve_disk(&disk(r"C:\ClusterStorage\VMs\X\Y.vhdx"), &files),
            Some(PathBuf::from("/m/X/Virtual Hard Disks/Y.vhdx"))
        );
    }

    #[test]
    fn falls_back_to_anywhere_in_the_clone() {
        let files = CloneFiles {
            entity_disks: vec![PathBuf::from("/m/X/boot.vhdx")],
            all_disks: vec![PathBuf::from("/m/X/boot.vhdx"), PathBuf::from("/m/shared/Y.VHDX")],
        };
        assert_eq!(
            resolve_disk(&disk(r"C:\VMs\X\Y.vhdx"), &files),
            Some(PathBuf::from("/m/shared/Y.VHDX"))
        );
        assert_eq!(resolve_disk(&disk(r"C:\VMs\X\Z.vhdx"), &files), None);
    }

    #[test]
    fn stage_names_read_well_in_errors() {
        assert_eq!(Stage::Validating.to_string(), "clone validation");
    }
}
