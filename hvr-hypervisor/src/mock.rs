//! In-memory hypervisor for tests.
//!
//! Keeps a set of machines and a journal of every call so tests can assert
//! what was asked of the hypervisor, and in which order.

use crate::{AdapterFacts, ClusterMembership, DiskFacts, Hypervisor, VmFacts};
use hvr_core::error::{HvrError, Result};
use hvr_metadata::{ControllerAddress, ControllerKind, MemoryPolicy, VlanPolicy};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// One journaled hypervisor call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HypervisorCall {
    ListClusteredVms,
    ReadVm(String),
    VmExists(String),
    CreateVm { name: String, generation: u8, memory_startup_bytes: u64 },
    SetProcessorCount { name: String, count: u32 },
    SetMemory { name: String, memory: MemoryPolicy },
    RemoveNetworkAdapters(String),
    AddNetworkAdapter { name: String, adapter: String, switch: Option<String> },
    SetAdapterMac { name: String, adapter: String, mac: String },
    SetAdapterVlan { name: String, adapter: String, vlan: VlanPolicy },
    AddHardDisk { name: String, path: String, controller: ControllerKind, address: ControllerAddress },
}

impl HypervisorCall {
    /// Machine a mutating call targets; `None` for read-only calls
    pub fn mutated_machine(&self) -> Option<&str> {
        match self {
            HypervisorCall::ListClusteredVms
            | HypervisorCall::ReadVm(_)
            | HypervisorCall::VmExists(_) => None,
            HypervisorCall::CreateVm { name, .. }
            | HypervisorCall::SetProcessorCount { name, .. }
            | HypervisorCall::SetMemory { name, .. }
            | HypervisorCall::AddNetworkAdapter { name, .. }
            | HypervisorCall::SetAdapterMac { name, .. }
            | HypervisorCall::SetAdapterVlan { name, .. }
            | HypervisorCall::AddHardDisk { name, .. } => Some(name),
            HypervisorCall::RemoveNetworkAdapters(name) => Some(name),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    machines: BTreeMap<String, VmFacts>,
    clustered: Vec<String>,
    unreadable: HashSet<String>,
    failing_adapters: HashSet<String>,
    failing_disks: HashSet<String>,
    calls: Vec<HypervisorCall>,
}

#[derive(Debug, Default)]
pub struct MockHypervisor {
    state: Mutex<State>,
}

impl MockHypervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing clustered machine
    pub fn with_machine(self, facts: VmFacts) -> Self {
        {
            let mut state = self.lock();
            state.clustered.push(facts.name.clone());
            state.machines.insert(facts.name.clone(), facts);
        }
        self
    }

    /// List `name` as clustered but fail every read of it
    pub fn with_unreadable(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            state.clustered.push(name.to_string());
            state.unreadable.insert(name.to_string());
        }
        self
    }

    /// Fail `add_network_adapter` for this adapter name
    pub fn failing_adapter(self, adapter: &str) -> Self {
        self.lock().failing_adapters.insert(adapter.to_string());
        self
    }

    /// Fail `add_hard_disk` for paths ending in this file name
    pub fn failing_disk(self, file_name: &str) -> Self {
        self.lock().failing_disks.insert(file_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<HypervisorCall> {
        self.lock().calls.clone()
    }

    pub fn machine(&self, name: &str) -> Option<VmFacts> {
        self.lock().machines.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned journal only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: HypervisorCall) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }

    fn with_created<F>(&self, call: HypervisorCall, name: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut VmFacts),
    {
        let mut state = self.record(call);
        match state.machines.get_mut(name) {
            Some(vm) => {
                apply(vm);
                Ok(())
            }
            None => Err(HvrError::Hypervisor(format!(
                "Hyper-V was unable to find a virtual machine with name \"{}\"",
                name
            ))),
        }
    }
}

impl Hypervisor for MockHypervisor {
    fn list_clustered_vms(&self) -> Result<Vec<String>> {
        Ok(self.record(HypervisorCall::ListClusteredVms).clustered.clone())
    }

    fn read_vm(&self, name: &str) -> Result<VmFacts> {
        let state = self.record(HypervisorCall::ReadVm(name.to_string()));
        if state.unreadable.contains(name) {
            return Err(HvrError::Hypervisor(format!("access denied reading '{}'", name)));
        }
        state
            .machines
            .get(name)
            .cloned()
            .ok_or_else(|| HvrError::NotFound(format!("machine '{}'", name)))
    }

    fn vm_exists(&self, name: &str) -> Result<bool> {
        let state = self.record(HypervisorCall::VmExists(name.to_string()));
        Ok(state.machines.keys().any(|k| k.eq_ignore_ascii_case(name)))
    }

    fn create_vm(&self, name: &str, generation: u8, memory_startup_bytes: u64) -> Result<()> {
        let mut state = self.record(HypervisorCall::CreateVm {
            name: name.to_string(),
            generation,
            memory_startup_bytes,
        });
        if state.machines.keys().any(|k| k.eq_ignore_ascii_case(name)) {
            return Err(HvrError::Hypervisor(format!("a machine named '{}' already exists", name)));
        }
        let default_adapter = AdapterFacts {
            name: "Network Adapter".to_string(),
            mac_address: None,
            dynamic_mac_address_enabled: true,
            switch_name: None,
            vlan_mode: Some("Untagged".to_string()),
            access_vlan_id: None,
            allowed_vlan_id_list: None,
        };
        state.machines.insert(
            name.to_string(),
            VmFacts {
                name: name.to_string(),
                generation,
                version: "9.0".to_string(),
                processor_count: 1,
                memory_startup: memory_startup_bytes,
                dynamic_memory_enabled: false,
                memory_minimum: memory_startup_bytes,
                memory_maximum: memory_startup_bytes,
                owner_node: None,
                path: None,
                adapters: vec![default_adapter],
                disks: Vec::new(),
            },
        );
        Ok(())
    }

    fn set_processor_count(&self, name: &str, count: u32) -> Result<()> {
        let call = HypervisorCall::SetProcessorCount { name: name.to_string(), count };
        self.with_created(call, name, |vm| vm.processor_count = count)
    }

    fn set_memory(&self, name: &str, memory: &MemoryPolicy) -> Result<()> {
        let call = HypervisorCall::SetMemory { name: name.to_string(), memory: *memory };
        let memory = *memory;
        self.with_created(call, name, move |vm| match memory {
            MemoryPolicy::Static { startup_bytes } => {
                vm.dynamic_memory_enabled = false;
                vm.memory_startup = startup_bytes;
            }
            MemoryPolicy::Dynamic { startup_bytes, minimum_bytes, maximum_bytes } => {
                vm.dynamic_memory_enabled = true;
                vm.memory_startup = startup_bytes;
                vm.memory_minimum = minimum_bytes;
                vm.memory_maximum = maximum_bytes;
            }
        })
    }

    fn remove_network_adapters(&self, name: &str) -> Result<()> {
        let call = HypervisorCall::RemoveNetworkAdapters(name.to_string());
        self.with_created(call, name, |vm| vm.adapters.clear())
    }

    fn add_network_adapter(&self, name: &str, adapter: &str, switch: Option<&str>) -> Result<()> {
        let call = HypervisorCall::AddNetworkAdapter {
            name: name.to_string(),
            adapter: adapter.to_string(),
            switch: switch.map(str::to_string),
        };
        if self.lock().failing_adapters.contains(adapter) {
            self.record(call);
            return Err(HvrError::Hypervisor(format!("switch for adapter '{}' not found", adapter)));
        }
        let facts = AdapterFacts {
            name: adapter.to_string(),
            mac_address: None,
            dynamic_mac_address_enabled: true,
            switch_name: switch.map(str::to_string),
            vlan_mode: Some("Untagged".to_string()),
            access_vlan_id: None,
            allowed_vlan_id_list: None,
        };
        self.with_created(call, name, move |vm| vm.adapters.push(facts))
    }

    fn set_adapter_mac(&self, name: &str, adapter: &str, mac: &str) -> Result<()> {
        let call = HypervisorCall::SetAdapterMac {
            name: name.to_string(),
            adapter: adapter.to_string(),
            mac: mac.to_string(),
        };
        let (adapter, mac) = (adapter.to_string(), mac.to_string());
        self.with_created(call, name, move |vm| {
            if let Some(a) = vm.adapters.iter_mut().find(|a| a.name == adapter) {
                a.mac_address = Some(mac);
                a.dynamic_mac_address_enabled = false;
            }
        })
    }

    fn set_adapter_vlan(&self, name: &str, adapter: &str, vlan: &VlanPolicy) -> Result<()> {
        let call = HypervisorCall::SetAdapterVlan {
            name: name.to_string(),
            adapter: adapter.to_string(),
            vlan: vlan.clone(),
        };
        let (adapter, vlan) = (adapter.to_string(), vlan.clone());
        self.with_created(call, name, move |vm| {
            if let Some(a) = vm.adapters.iter_mut().find(|a| a.name == adapter) {
                match vlan {
                    VlanPolicy::None => {
                        a.vlan_mode = Some("Untagged".into());
                        a.access_vlan_id = None;
                        a.allowed_vlan_id_list = None;
                    }
                    VlanPolicy::Access(tag) => {
                        a.vlan_mode = Some("Access".into());
                        a.access_vlan_id = Some(tag);
                    }
                    VlanPolicy::Trunk(tags) => {
                        let list: Vec<String> = tags.iter().map(u16::to_string).collect();
                        a.vlan_mode = Some("Trunk".into());
                        a.allowed_vlan_id_list = Some(list.join(","));
                    }
                }
            }
        })
    }

    fn add_hard_disk(
        &self,
        name: &str,
        path: &str,
        controller: ControllerKind,
        address: ControllerAddress,
    ) -> Result<()> {
        let call = HypervisorCall::AddHardDisk {
            name: name.to_string(),
            path: path.to_string(),
            controller,
            address,
        };
        let failing = {
            let state = self.lock();
            state.failing_disks.iter().any(|f| path.ends_with(f.as_str()))
        };
        if failing {
            self.record(call);
            return Err(HvrError::Hypervisor(format!("'{}' is in use by another process", path)));
        }
        let disk = DiskFacts {
            controller_type: controller.to_string(),
            controller_number: Some(address.channel),
            controller_location: address.slot,
            path: path.to_string(),
        };
        self.with_created(call, name, move |vm| vm.disks.push(disk))
    }
}

/// Cluster whose answers are fixed up front
#[derive(Debug, Clone)]
pub struct MockCluster {
    pub local: String,
    pub owner: std::result::Result<String, String>,
}

impl MockCluster {
    pub fn owned_by(local: &str, owner: &str) -> Self {
        Self {
            local: local.to_string(),
            owner: Ok(owner.to_string()),
        }
    }

    pub fn unreachable(local: &str, error: &str) -> Self {
        Self {
            local: local.to_string(),
            owner: Err(error.to_string()),
        }
    }
}

impl ClusterMembership for MockCluster {
    fn owner_of(&self, _group: &str) -> Result<String> {
        self.owner.clone().map_err(HvrError::Hypervisor)
    }

    fn local_node(&self) -> Result<String> {
        Ok(self.local.clone())
    }
}
