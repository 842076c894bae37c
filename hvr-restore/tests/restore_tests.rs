use chrono::{Duration, TimeZone, Utc};
use hvr_config::{ExistingPolicy, RestoreSettings};
use hvr_core::error::{HvrError, Result};
use hvr_hypervisor::mock::{HypervisorCall, MockHypervisor};
use hvr_hypervisor::VmFacts;
use hvr_metadata::{
    ConfigurationRecord, ControllerAddress, ControllerKind, DiskSpec, MemoryPolicy,
    MetadataStore, NetworkAdapterSpec, VlanPolicy,
};
use hvr_restore::{
    locate_orphan, Choice, CleanupStep, FixedSelector, RestoreOrchestrator, RestoreRequest,
    RestoreSession, Stage,
};
use hvr_storage::{CloneId, ShareId, StorageApi, StorageSnapshot, VolumeId};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CLONE_LAYOUT: &[&str] = &[
    "SQL01/Virtual Hard Disks/SQL01_os.vhdx",
    "SQL01/Virtual Hard Disks/SQL01_data.vhdx",
    "SQL01/Virtual Machines/5F3C1A2B.vmcx",
    "WEB01/Virtual Hard Disks/WEB01.vhdx",
];

/// Storage controller double. Creating a share materialises the clone's
/// files under the share root so validation has something to look at.
struct FakeStorage {
    share_root: PathBuf,
    layout: Vec<&'static str>,
    snapshots: Vec<&'static str>,
    fail_clone_creation: bool,
    fail_share_creation: bool,
    fail_share_deletion: bool,
    shares: RefCell<Vec<ShareId>>,
    calls: RefCell<Vec<String>>,
}

impl FakeStorage {
    fn new(share_root: PathBuf) -> Self {
        Self {
            share_root,
            layout: CLONE_LAYOUT.to_vec(),
            snapshots: vec!["vserver_x", "snapmirror_y", "daily_2023", "daily_2024"],
            fail_clone_creation: false,
            fail_share_creation: false,
            fail_share_deletion: false,
            shares: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl StorageApi for FakeStorage {
    fn find_volume(&self, name: &str) -> Result<VolumeId> {
        self.log(format!("findVolume {}", name));
        if name == "vol_vms" || name.contains("_clone_") {
            Ok(VolumeId {
                uuid: format!("{}-uuid", name),
                name: name.to_string(),
            })
        } else {
            Err(HvrError::NotFound(format!("volume '{}'", name)))
        }
    }

    fn list_snapshots(&self, volume: &VolumeId) -> Result<Vec<StorageSnapshot>> {
        self.log(format!("listSnapshots {}", volume.name));
        Ok(self
            .snapshots
            .iter()
            .enumerate()
            .map(|(i, name)| StorageSnapshot {
                name: name.to_string(),
                create_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::days(i as i64),
                volume: volume.clone(),
            })
            .collect())
    }

    fn create_clone(
        &self,
        name: &str,
        parent: &VolumeId,
        snapshot: &StorageSnapshot,
    ) -> Result<CloneId> {
        self.log(format!("createClone {} from {}@{}", name, parent.name, snapshot.name));
        if self.fail_clone_creation {
            return Err(HvrError::NotFound(format!("volume '{}'", name)));
        }
        Ok(VolumeId {
            uuid: "clone-uuid-1".into(),
            name: name.to_string(),
        })
    }

    fn create_share(&self, name: &str, path: &str) -> Result<ShareId> {
        self.log(format!("createShare {} {}", name, path));
        if self.fail_share_creation {
            return Err(HvrError::remote("createShare", Some(500), "share service unavailable"));
        }
        let mount = self.share_root.join(name);
        for file in &self.layout {
            let file = mount.join(file);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(&file, b"disk").unwrap();
        }
        fs::create_dir_all(&mount).unwrap();
        let share = ShareId {
            name: name.to_string(),
            svm_uuid: Some("svm-uuid-1".into()),
        };
        self.shares.borrow_mut().push(share.clone());
        Ok(share)
    }

    fn find_share(&self, name: &str) -> Result<ShareId> {
        self.log(format!("findShare {}", name));
        self.shares
            .borrow()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| HvrError::NotFound(format!("share '{}'", name)))
    }

    fn delete_share(&self, share: &ShareId) -> Result<()> {
        self.log(format!("deleteShare {}", share));
        if self.fail_share_deletion {
            return Err(HvrError::remote("deleteShare", Some(409), "share has open files"));
        }
        Ok(())
    }

    fn delete_clone(&self, clone: &CloneId) -> Result<()> {
        self.log(format!("deleteClone {}", clone.uuid));
        Ok(())
    }
}

struct RestoreFixture {
    _temp_dir: TempDir,
    store: MetadataStore,
    share_root: PathBuf,
}

impl RestoreFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("VMConfigBackups"));
        let share_root = temp_dir.path().join("shares");
        fs::create_dir_all(&share_root).unwrap();
        Self {
            _temp_dir: temp_dir,
            store,
            share_root,
        }
    }

    fn with_record(self, record: ConfigurationRecord, day: u32) -> Self {
        let at = Utc.with_ymd_and_hms(2024, 5, day, 2, 0, 0).unwrap();
        self.store.append(&record, at).unwrap();
        self
    }

    fn storage(&self) -> FakeStorage {
        FakeStorage::new(self.share_root.clone())
    }

    fn orchestrator<'a>(
        &'a self,
        storage: &'a FakeStorage,
        hypervisor: &'a MockHypervisor,
        settings: RestoreSettings,
    ) -> RestoreOrchestrator<'a> {
        RestoreOrchestrator::new(
            &self.store,
            storage,
            hypervisor,
            settings,
            self.share_root.to_string_lossy(),
        )
    }
}

fn sql01_record() -> ConfigurationRecord {
    ConfigurationRecord {
        entity_name: "SQL01".into(),
        owner_node: Some("HV01".into()),
        storage_volume: Some("vol_vms".into()),
        generation: 2,
        config_version: "9.0".into(),
        cpu_count: 4,
        memory: MemoryPolicy::Dynamic {
            startup_bytes: 4 << 30,
            minimum_bytes: 2 << 30,
            maximum_bytes: 8 << 30,
        },
        network_adapters: vec![
            NetworkAdapterSpec {
                name: "Prod".into(),
                mac_address: Some("00155D0A0B01".into()),
                switch_name: Some("vSwitch".into()),
                vlan: VlanPolicy::Access(120),
            },
            NetworkAdapterSpec {
                name: "Trunk".into(),
                mac_address: None,
                switch_name: Some("vSwitch".into()),
                vlan: VlanPolicy::trunk([10, 20]),
            },
        ],
        disks: vec![
            DiskSpec {
                controller: ControllerKind::Scsi,
                address: ControllerAddress { channel: 0, slot: 0 },
                path: r"C:\ClusterStorage\vol_vms\SQL01\Virtual Hard Disks\SQL01_os.vhdx".into(),
            },
            DiskSpec {
                controller: ControllerKind::Scsi,
                address: ControllerAddress { channel: 0, slot: 1 },
                path: r"C:\ClusterStorage\vol_vms\SQL01\Virtual Hard Disks\SQL01_data.vhdx".into(),
            },
        ],
    }
}

fn existing(name: &str) -> VmFacts {
    VmFacts {
        name: name.into(),
        generation: 2,
        version: "9.0".into(),
        processor_count: 4,
        memory_startup: 4 << 30,
        dynamic_memory_enabled: false,
        memory_minimum: 4 << 30,
        memory_maximum: 4 << 30,
        owner_node: Some("HV01".into()),
        path: None,
        adapters: Vec::new(),
        disks: Vec::new(),
    }
}

fn request() -> RestoreRequest {
    RestoreRequest {
        entity: "SQL01".into(),
        volume: "vol_vms".into(),
    }
}

fn answers() -> FixedSelector {
    FixedSelector::new()
        .then_choose(Choice::Index(0))
        .then_choose(Choice::Key("daily_2024".into()))
}

fn mutated(hypervisor: &MockHypervisor) -> Vec<String> {
    hypervisor
        .calls()
        .iter()
        .filter_map(|c| c.mutated_machine().map(str::to_string))
        .collect()
}

#[test]
fn sql01_restores_next_to_the_original_and_cleans_up_only_its_own_storage() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new().with_machine(existing("SQL01"));
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut selector = answers();
    let mut session = RestoreSession::new();

    let outcome = orchestrator
        .run(&request(), &mut selector, &mut session)
        .unwrap();

    assert_eq!(session.stage(), Stage::Complete);
    assert_eq!(outcome.target, "SQL01_Restored");
    assert_eq!(outcome.snapshot, "daily_2024");
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    // One clone and one share, named after each other.
    let clone = outcome.handle.clone_name().to_string();
    assert!(clone.starts_with("vol_vms_clone_"));
    assert_eq!(outcome.handle.share_name, format!("hvr_{}", clone));
    let calls = storage.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("createClone")).count(), 1);
    assert_eq!(calls.iter().filter(|c| c.starts_with("createShare")).count(), 1);
    assert!(calls.contains(&format!("createClone {} from vol_vms@daily_2024", clone)));

    // The original is never a mutation target.
    assert!(mutated(&hypervisor).iter().all(|m| m == "SQL01_Restored"));
    assert_eq!(hypervisor.machine("SQL01"), Some(existing("SQL01")));

    let restored = hypervisor.machine("SQL01_Restored").unwrap();
    assert_eq!(restored.processor_count, 4);
    assert!(restored.dynamic_memory_enabled);
    assert_eq!(restored.adapters.len(), 2);
    assert_eq!(restored.adapters[0].name, "Prod");
    assert_eq!(restored.adapters[0].access_vlan_id, Some(120));
    assert_eq!(restored.adapters[0].mac_address.as_deref(), Some("00155D0A0B01"));
    assert_eq!(restored.adapters[1].vlan_mode.as_deref(), Some("Trunk"));
    assert_eq!(restored.adapters[1].allowed_vlan_id_list.as_deref(), Some("10,20"));

    assert_eq!(restored.disks.len(), 2);
    let mount = &outcome.handle.mount_path;
    assert_eq!(
        PathBuf::from(&restored.disks[0].path),
        mount.join("SQL01/Virtual Hard Disks/SQL01_os.vhdx")
    );
    assert_eq!(restored.disks[0].controller_location, 0);
    assert_eq!(restored.disks[1].controller_location, 1);
    assert_eq!(restored.disks[1].controller_type, "SCSI");

    // Cleanup deletes exactly what this run created, share first.
    let before = storage.calls().len();
    let report = orchestrator.cleanup(&mut session).unwrap();
    assert!(report.is_clean());
    assert!(session.handle().is_none());
    assert_eq!(
        storage.calls()[before..].to_vec(),
        vec![
            format!("deleteShare svm-uuid-1/hvr_{}", clone),
            "deleteClone clone-uuid-1".to_string()
        ]
    );
}

#[test]
fn existing_target_gets_a_timestamped_name() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new()
        .with_machine(existing("SQL01"))
        .with_machine(existing("SQL01_Restored"));
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());

    let outcome = orchestrator
        .run(&request(), &mut answers(), &mut RestoreSession::new())
        .unwrap();

    assert!(outcome.target.starts_with("SQL01_Restored_"));
    assert_eq!(outcome.target.len(), "SQL01_Restored_20240501_020000".len());
    assert!(mutated(&hypervisor).iter().all(|m| m == &outcome.target));
    assert_eq!(hypervisor.machine("SQL01_Restored"), Some(existing("SQL01_Restored")));
}

#[test]
fn abort_policy_stops_before_touching_the_hypervisor_and_keeps_the_clone() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new().with_machine(existing("SQL01_Restored"));
    let settings = RestoreSettings {
        on_existing: ExistingPolicy::Abort,
        ..RestoreSettings::default()
    };
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, settings);
    let mut session = RestoreSession::new();

    let err = orchestrator
        .run(&request(), &mut answers(), &mut session)
        .unwrap_err();

    assert!(matches!(err, HvrError::Conflict(_)));
    assert_eq!(session.stage(), Stage::Reconstructing);
    assert!(mutated(&hypervisor).is_empty());
    let handle = session.handle().unwrap();
    assert!(handle.share.is_some());
    assert!(!storage.calls().iter().any(|c| c.starts_with("delete")));
}

#[test]
fn newest_record_is_offered_first() {
    let mut older = sql01_record();
    older.cpu_count = 2;
    let fixture = RestoreFixture::new()
        .with_record(older, 1)
        .with_record(sql01_record(), 3);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());

    let outcome = orchestrator
        .run(&request(), &mut answers(), &mut RestoreSession::new())
        .unwrap();
    assert_eq!(outcome.record, "SQL01_20240503_020000");
    assert_eq!(hypervisor.machine("SQL01_Restored").unwrap().processor_count, 4);
}

#[test]
fn unknown_entity_fails_before_any_remote_call() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();

    let request = RestoreRequest {
        entity: "SQL99".into(),
        volume: "vol_vms".into(),
    };
    let err = orchestrator
        .run(&request, &mut answers(), &mut session)
        .unwrap_err();

    assert!(matches!(err, HvrError::Input(_)));
    assert_eq!(session.stage(), Stage::SelectRecord);
    assert!(storage.calls().is_empty());
    assert!(hypervisor.calls().is_empty());
}

#[test]
fn unknown_volume_is_an_input_error_and_creates_nothing() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();

    let request = RestoreRequest {
        entity: "SQL01".into(),
        volume: "vol_missing".into(),
    };
    let err = orchestrator
        .run(&request, &mut answers(), &mut session)
        .unwrap_err();

    assert!(matches!(err, HvrError::Input(_)));
    assert_eq!(session.stage(), Stage::SelectSnapshot);
    assert!(session.handle().is_none());
}

#[test]
fn infrastructure_snapshots_are_never_offered() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.snapshots = vec!["vserver_daily", "snapmirror.1234"];
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut selector = answers();

    let err = orchestrator
        .run(&request(), &mut selector, &mut RestoreSession::new())
        .unwrap_err();
    assert!(err.to_string().contains("no restorable snapshots"));
    // Only the record prompt was shown.
    assert_eq!(selector.prompts.len(), 1);
}

#[test]
fn clone_without_the_machine_folder_fails_validation_but_is_kept() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.layout = vec!["WEB01/Virtual Hard Disks/WEB01.vhdx"];
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();

    let err = orchestrator
        .run(&request(), &mut answers(), &mut session)
        .unwrap_err();

    assert!(matches!(err, HvrError::Validation(_)));
    assert_eq!(session.stage(), Stage::Validating);
    assert!(session.handle().unwrap().share.is_some());
    assert!(hypervisor.calls().is_empty());
}

#[test]
fn machine_folder_without_disks_fails_validation() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.layout = vec!["SQL01/Virtual Machines/5F3C1A2B.vmcx"];
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());

    let err = orchestrator
        .run(&request(), &mut answers(), &mut RestoreSession::new())
        .unwrap_err();
    assert!(matches!(err, HvrError::Validation(_)));
}

#[test]
fn failed_share_keeps_the_clone_handle_and_cleanup_finds_no_share() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.fail_share_creation = true;
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();

    let err = orchestrator
        .run(&request(), &mut answers(), &mut session)
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(session.stage(), Stage::Provisioning);
    let share_name = {
        let handle = session.handle().unwrap();
        assert!(handle.share.is_none());
        assert_eq!(handle.clone.uuid, "clone-uuid-1");
        handle.share_name.clone()
    };

    let report = orchestrator.cleanup(&mut session).unwrap();
    assert!(matches!(report.share, CleanupStep::NotPresent));
    assert!(matches!(report.clone, CleanupStep::Deleted));
    let calls = storage.calls();
    assert!(calls.contains(&format!("findShare {}", share_name)));
    assert_eq!(calls.last().unwrap(), "deleteClone clone-uuid-1");
}

#[test]
fn failed_clone_creation_still_names_the_requested_clone() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.fail_clone_creation = true;
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();

    let err = orchestrator
        .run(&request(), &mut answers(), &mut session)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(session.stage(), Stage::Provisioning);
    assert!(session.handle().is_none());

    let pending = session.pending_clone().unwrap();
    assert!(pending.starts_with("vol_vms_clone_"), "{}", pending);
    assert!(hvr_storage::is_clone_name(pending));
    let calls = storage.calls();
    assert_eq!(
        calls.last().unwrap(),
        &format!("createClone {} from vol_vms@daily_2024", pending)
    );
    assert!(orchestrator.cleanup(&mut session).is_none());
}

#[test]
fn successful_clone_clears_the_pending_name() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.fail_share_creation = true;
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();

    orchestrator
        .run(&request(), &mut answers(), &mut session)
        .unwrap_err();
    assert!(session.pending_clone().is_none());
    assert!(session.handle().is_some());
}

#[test]
fn missing_disk_is_a_warning_and_found_disks_are_still_attached() {
    let mut record = sql01_record();
    record.disks.push(DiskSpec {
        controller: ControllerKind::Ide,
        address: ControllerAddress { channel: 1, slot: 0 },
        path: r"C:\ISO\tools.vhd".into(),
    });
    let fixture = RestoreFixture::new().with_record(record, 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());

    let outcome = orchestrator
        .run(&request(), &mut answers(), &mut RestoreSession::new())
        .unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("tools.vhd"));
    assert_eq!(hypervisor.machine("SQL01_Restored").unwrap().disks.len(), 2);
}

#[test]
fn disk_outside_the_machine_folder_is_found_by_name() {
    let mut record = sql01_record();
    record.disks[1].path = r"C:\ClusterStorage\vol_vms\Shared\WEB01.vhdx".into();
    let fixture = RestoreFixture::new().with_record(record, 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());

    let outcome = orchestrator
        .run(&request(), &mut answers(), &mut RestoreSession::new())
        .unwrap();
    let disks = hypervisor.machine("SQL01_Restored").unwrap().disks;
    assert_eq!(
        PathBuf::from(&disks[1].path),
        outcome.handle.mount_path.join("WEB01/Virtual Hard Disks/WEB01.vhdx")
    );
}

#[test]
fn adapter_failures_do_not_stop_reconstruction() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let storage = fixture.storage();
    let hypervisor = MockHypervisor::new().failing_adapter("Prod");
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());

    let outcome = orchestrator
        .run(&request(), &mut answers(), &mut RestoreSession::new())
        .unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("Prod"));

    let restored = hypervisor.machine("SQL01_Restored").unwrap();
    assert_eq!(restored.adapters.len(), 1);
    assert_eq!(restored.disks.len(), 2);
    // No MAC or VLAN call for the adapter that was never added.
    assert!(!hypervisor.calls().iter().any(|c| matches!(
        c,
        HypervisorCall::SetAdapterMac { adapter, .. } if adapter == "Prod"
    )));
}

#[test]
fn cleanup_attempts_the_clone_even_when_the_share_fails() {
    let fixture = RestoreFixture::new().with_record(sql01_record(), 1);
    let mut storage = fixture.storage();
    storage.fail_share_deletion = true;
    let hypervisor = MockHypervisor::new();
    let orchestrator = fixture.orchestrator(&storage, &hypervisor, RestoreSettings::default());
    let mut session = RestoreSession::new();
    orchestrator
        .run(&request(), &mut answers(), &mut session)
        .unwrap();

    let report = orchestrator.cleanup(&mut session).unwrap();
    assert!(report.share.is_failure());
    assert!(matches!(report.clone, CleanupStep::Deleted));
    // The handle survives so the share can be retried.
    assert!(session.handle().is_some());
}

#[test]
fn orphan_lookup_refuses_volumes_it_did_not_create() {
    let fixture = RestoreFixture::new();
    let storage = fixture.storage();

    let err = locate_orphan(&storage, "vol_vms", "/shares").unwrap_err();
    assert!(matches!(err, HvrError::Input(_)));
    assert!(storage.calls().is_empty());

    let handle = locate_orphan(&storage, "vol_vms_clone_20240501020304_0a1b2c3d", "/shares")
        .unwrap()
        .unwrap();
    assert_eq!(handle.share_name, "hvr_vol_vms_clone_20240501020304_0a1b2c3d");
    assert!(handle.share.is_none());
}
