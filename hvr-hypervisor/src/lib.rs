//! Hypervisor and cluster collaborators.
//!
//! The capture and restore pipelines never talk to Hyper-V or the failover
//! cluster directly. They go through the [`Hypervisor`] and
//! [`ClusterMembership`] traits, implemented here by a PowerShell backend and,
//! for tests, an in-memory mock.

use hvr_core::error::Result;
use hvr_metadata::{ControllerAddress, ControllerKind, MemoryPolicy, VlanPolicy};
use serde::Deserialize;

pub mod powershell;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use powershell::PowerShellHypervisor;

/// Live facts about one machine, as reported by the hypervisor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmFacts {
    pub name: String,
    pub generation: u8,
    pub version: String,
    pub processor_count: u32,
    pub memory_startup: u64,
    pub dynamic_memory_enabled: bool,
    pub memory_minimum: u64,
    pub memory_maximum: u64,
    pub owner_node: Option<String>,
    /// Directory holding the machine's configuration files
    pub path: Option<String>,
    pub adapters: Vec<AdapterFacts>,
    pub disks: Vec<DiskFacts>,
}

/// A network adapter with its VLAN settings in the hypervisor's raw form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterFacts {
    pub name: String,
    pub mac_address: Option<String>,
    pub dynamic_mac_address_enabled: bool,
    pub switch_name: Option<String>,
    /// `Untagged`, `Access`, `Trunk` (others are treated as untagged)
    pub vlan_mode: Option<String>,
    pub access_vlan_id: Option<u16>,
    /// Comma separated ids and ranges, e.g. `10,20-22`
    pub allowed_vlan_id_list: Option<String>,
}

/// A disk attachment. `controller_number` is absent when the hypervisor only
/// reported a flat slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskFacts {
    pub controller_type: String,
    pub controller_number: Option<u32>,
    pub controller_location: u32,
    pub path: String,
}

/// Machine lifecycle and inspection primitives.
///
/// Mutating calls are only ever issued against machines this process created.
pub trait Hypervisor {
    /// Names of all clustered machine entities
    fn list_clustered_vms(&self) -> Result<Vec<String>>;

    fn read_vm(&self, name: &str) -> Result<VmFacts>;

    /// Exact, case-insensitive name match
    fn vm_exists(&self, name: &str) -> Result<bool>;

    /// Create an empty machine with no disks attached
    fn create_vm(&self, name: &str, generation: u8, memory_startup_bytes: u64) -> Result<()>;

    fn set_processor_count(&self, name: &str, count: u32) -> Result<()>;

    fn set_memory(&self, name: &str, memory: &MemoryPolicy) -> Result<()>;

    /// Remove every adapter; new machines come with a default one
    fn remove_network_adapters(&self, name: &str) -> Result<()>;

    fn add_network_adapter(&self, name: &str, adapter: &str, switch: Option<&str>) -> Result<()>;

    fn set_adapter_mac(&self, name: &str, adapter: &str, mac: &str) -> Result<()>;

    fn set_adapter_vlan(&self, name: &str, adapter: &str, vlan: &VlanPolicy) -> Result<()>;

    fn add_hard_disk(
        &self,
        name: &str,
        path: &str,
        controller: ControllerKind,
        address: ControllerAddress,
    ) -> Result<()>;
}

/// Cluster ownership primitive used by the capture leader gate
pub trait ClusterMembership {
    /// Node currently owning `group`
    fn owner_of(&self, group: &str) -> Result<String>;

    fn local_node(&self) -> Result<String>;
}
