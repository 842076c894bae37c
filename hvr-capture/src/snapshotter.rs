//! Turns live hypervisor facts into configuration records.

use hvr_core::error::{HvrError, Result};
use hvr_hypervisor::{AdapterFacts, DiskFacts, Hypervisor, VmFacts};
use hvr_metadata::record::MAX_VLAN_ID;
use hvr_metadata::{
    ConfigurationRecord, ControllerAddress, ControllerKind, DiskSpec, MemoryPolicy,
    NetworkAdapterSpec, VlanPolicy,
};
use tracing::{debug, info, warn};

/// Records that were read, and the machines that could not be
#[derive(Debug, Default)]
pub struct CaptureOutcome {
    pub records: Vec<ConfigurationRecord>,
    pub failures: Vec<(String, HvrError)>,
}

pub struct Snapshotter<'a> {
    hypervisor: &'a dyn Hypervisor,
}

impl<'a> Snapshotter<'a> {
    pub fn new(hypervisor: &'a dyn Hypervisor) -> Self {
        Self { hypervisor }
    }

    /// Read every clustered machine.
    ///
    /// Only the enumeration itself is fatal. A machine that cannot be read is
    /// logged and skipped.
    pub fn capture_all(&self) -> Result<CaptureOutcome> {
        let names = self.hypervisor.list_clustered_vms()?;
        info!(count = names.len(), "capturing clustered machines");

        let mut outcome = CaptureOutcome::default();
        for name in names {
            match self.capture(&name) {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    warn!(entity = %name, error = %e, "skipping machine");
                    outcome.failures.push((name, e));
                }
            }
        }
        Ok(outcome)
    }

    pub fn capture(&self, name: &str) -> Result<ConfigurationRecord> {
        let facts = self.hypervisor.read_vm(name)?;
        let record = to_record(facts)?;
        record.validate().map_err(|reason| {
            HvrError::Hypervisor(format!("'{}' reported an unusable configuration: {}", name, reason))
        })?;
        debug!(
            entity = %record.entity_name,
            adapters = record.network_adapters.len(),
            disks = record.disks.len(),
            "machine captured"
        );
        Ok(record)
    }
}

fn to_record(facts: VmFacts) -> Result<ConfigurationRecord> {
    let memory = if facts.dynamic_memory_enabled {
        MemoryPolicy::Dynamic {
            startup_bytes: facts.memory_startup,
            minimum_bytes: facts.memory_minimum,
            maximum_bytes: facts.memory_maximum,
        }
    } else {
        MemoryPolicy::Static {
            startup_bytes: facts.memory_startup,
        }
    };

    let network_adapters = facts
        .adapters
        .iter()
        .map(adapter_spec)
        .collect::<Result<Vec<_>>>()?;

    let mut disks = Vec::with_capacity(facts.disks.len());
    for disk in &facts.disks {
        match disk_spec(disk) {
            Some(spec) => disks.push(spec),
            None => warn!(
                entity = %facts.name,
                controller = %disk.controller_type,
                path = %disk.path,
                "ignoring disk on unsupported controller"
            ),
        }
    }

    Ok(ConfigurationRecord {
        storage_volume: facts.path.as_deref().and_then(volume_hint),
        entity_name: facts.name,
        owner_node: facts.owner_node.filter(|n| !n.is_empty()),
        generation: facts.generation,
        config_version: facts.version,
        cpu_count: facts.processor_count,
        memory,
        network_adapters,
        disks,
    })
}

fn adapter_spec(adapter: &AdapterFacts) -> Result<NetworkAdapterSpec> {
    let mac_address = match &adapter.mac_address {
        Some(mac) if !adapter.dynamic_mac_address_enabled && mac.chars().any(|c| c != '0') => {
            Some(mac.clone())
        }
        _ => None,
    };
    Ok(NetworkAdapterSpec {
        name: adapter.name.clone(),
        mac_address,
        switch_name: adapter.switch_name.clone().filter(|s| !s.is_empty()),
        vlan: reduce_vlan(adapter)?,
    })
}

/// Collapse the hypervisor's VLAN view into a policy.
///
/// Access with tag 0 and trunks with no allowed tags mean untagged. Private
/// VLAN modes are not carried.
pub fn reduce_vlan(adapter: &AdapterFacts) -> Result<VlanPolicy> {
    let mode = adapter.vlan_mode.as_deref().unwrap_or("").trim();
    if mode.eq_ignore_ascii_case("access") {
        let tag = adapter.access_vlan_id.unwrap_or(0);
        if tag > MAX_VLAN_ID {
            return Err(HvrError::Hypervisor(format!(
                "adapter '{}' reports access VLAN {}",
                adapter.name, tag
            )));
        }
        Ok(VlanPolicy::access(tag))
    } else if mode.eq_ignore_ascii_case("trunk") {
        let list = adapter.allowed_vlan_id_list.as_deref().unwrap_or("");
        let tags = parse_vlan_list(list).map_err(|reason| {
            HvrError::Hypervisor(format!(
                "adapter '{}' reports an unreadable trunk list '{}': {}",
                adapter.name, list, reason
            ))
        })?;
        Ok(VlanPolicy::trunk(tags))
    } else {
        Ok(VlanPolicy::None)
    }
}

/// Parse `10,20-22` into `[10, 20, 21, 22]`
pub fn parse_vlan_list(list: &str) -> std::result::Result<Vec<u16>, String> {
    let mut tags = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (low, high) = match part.split_once('-') {
            Some((low, high)) => (parse_tag(low)?, parse_tag(high)?),
            None => {
                let tag = parse_tag(part)?;
                (tag, tag)
            }
        };
        if low > high {
            return Err(format!("range {} is reversed", part));
        }
        tags.extend(low..=high);
    }
    Ok(tags)
}

fn parse_tag(text: &str) -> std::result::Result<u16, String> {
    let tag: u16 = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a VLAN id", text.trim()))?;
    if tag == 0 || tag > MAX_VLAN_ID {
        return Err(format!("VLAN id {} is outside 1..={}", tag, MAX_VLAN_ID));
    }
    Ok(tag)
}

fn controller_kind(controller_type: &str) -> Option<ControllerKind> {
    match controller_type.trim().to_ascii_uppercase().as_str() {
        "IDE" => Some(ControllerKind::Ide),
        "SCSI" => Some(ControllerKind::Scsi),
        _ => None,
    }
}

/// Two-part address; a bare slot is taken to be on channel 0
pub fn disk_address(disk: &DiskFacts) -> ControllerAddress {
    ControllerAddress {
        channel: disk.controller_number.unwrap_or(0),
        slot: disk.controller_location,
    }
}

fn disk_spec(disk: &DiskFacts) -> Option<DiskSpec> {
    Some(DiskSpec {
        controller: controller_kind(&disk.controller_type)?,
        address: disk_address(disk),
        path: disk.path.clone(),
    })
}

/// `C:\ClusterStorage\Volume1\SQL01` yields `Volume1`
fn volume_hint(path: &str) -> Option<String> {
    let mut parts = path.split(['\\', '/']).filter(|p| !p.is_empty());
    parts.find(|p| p.eq_ignore_ascii_case("ClusterStorage"))?;
    parts.next().map(str::to_string)
}
