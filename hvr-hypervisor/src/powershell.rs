//! Hyper-V and failover cluster cmdlets driven through PowerShell.
//!
//! Every query wraps its result in `ConvertTo-Json -InputObject @(...)` so the
//! output is always a JSON array, even for zero or one item.

use crate::{ClusterMembership, Hypervisor, VmFacts};
use hvr_core::error::{HvrError, Result};
use hvr_metadata::{ControllerAddress, ControllerKind, MemoryPolicy, VlanPolicy};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Quote a value as a PowerShell single-quoted string literal
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Backend that shells out to `powershell.exe` (or `pwsh`)
#[derive(Debug, Clone)]
pub struct PowerShellHypervisor {
    program: String,
}

impl Default for PowerShellHypervisor {
    fn default() -> Self {
        Self::new("powershell.exe")
    }
}

impl PowerShellHypervisor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run a script and return its stdout. A non-zero exit carries stderr verbatim.
    fn run(&self, script: &str) -> Result<String> {
        debug!(program = %self.program, script = %script, "running PowerShell");
        let script = format!("$ErrorActionPreference = 'Stop'; {}", script);
        let output = duct::cmd(
            self.program.as_str(),
            ["-NoProfile", "-NonInteractive", "-Command", script.as_str()],
        )
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|e| HvrError::Hypervisor(format!("Failed to start {}: {}", self.program, e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(HvrError::Hypervisor(if stderr.is_empty() {
                format!("PowerShell exited with {}", output.status)
            } else {
                stderr
            }))
        }
    }

    /// Run a pipeline and decode its objects as a sequence
    fn query<T: DeserializeOwned>(&self, pipeline: &str) -> Result<Vec<T>> {
        let stdout = self.run(&format!(
            "ConvertTo-Json -Depth 5 -Compress -InputObject @({})",
            pipeline
        ))?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(trimmed).map_err(|e| {
            HvrError::Hypervisor(format!("Unexpected PowerShell output ({}): {}", e, trimmed))
        })
    }

    fn single<T: DeserializeOwned>(&self, pipeline: &str, what: &str) -> Result<T> {
        self.query(pipeline)?
            .into_iter()
            .next()
            .ok_or_else(|| HvrError::NotFound(what.to_string()))
    }
}

fn vm_facts_script(name: &str) -> String {
    format!(
        r#"Get-VM | Where-Object {{ $_.Name -eq {name} }} | Select-Object -First 1 | ForEach-Object {{
    $vm = $_
    [pscustomobject]@{{
        Name = $vm.Name
        Generation = [int]$vm.Generation
        Version = [string]$vm.Version
        ProcessorCount = [int]$vm.ProcessorCount
        MemoryStartup = [int64]$vm.MemoryStartup
        DynamicMemoryEnabled = [bool]$vm.DynamicMemoryEnabled
        MemoryMinimum = [int64]$vm.MemoryMinimum
        MemoryMaximum = [int64]$vm.MemoryMaximum
        OwnerNode = [string]$vm.ComputerName
        Path = [string]$vm.Path
        Adapters = @(Get-VMNetworkAdapter -VM $vm | ForEach-Object {{
            $vlan = Get-VMNetworkAdapterVlan -VMNetworkAdapter $_
            [pscustomobject]@{{
                Name = $_.Name
                MacAddress = $_.MacAddress
                DynamicMacAddressEnabled = [bool]$_.DynamicMacAddressEnabled
                SwitchName = $_.SwitchName
                VlanMode = [string]$vlan.OperationMode
                AccessVlanId = [int]$vlan.AccessVlanId
                AllowedVlanIdList = [string]$vlan.AllowedVlanIdListString
            }}
        }})
        Disks = @(Get-VMHardDiskDrive -VM $vm | ForEach-Object {{
            [pscustomobject]@{{
                ControllerType = [string]$_.ControllerType
                ControllerNumber = $_.ControllerNumber
                ControllerLocation = [int]$_.ControllerLocation
                Path = $_.Path
            }}
        }})
    }}
}}"#,
        name = ps_quote(name)
    )
}

/// Names equal to `name` among local machines, clustered roles and machines on
/// every cluster node. Cluster lookups are skipped on a standalone host.
fn vm_exists_script(name: &str) -> String {
    format!(
        r#"& {{
    Get-VM | ForEach-Object {{ $_.Name }}
    if (Get-Command Get-ClusterNode -ErrorAction SilentlyContinue) {{
        Get-ClusterGroup | Where-Object {{ [string]$_.GroupType -eq 'VirtualMachine' }} | ForEach-Object {{ $_.Name }}
        Get-VM -ComputerName @(Get-ClusterNode | ForEach-Object {{ $_.Name }}) | ForEach-Object {{ $_.Name }}
    }}
}} | Where-Object {{ $_ -eq {name} }} | Select-Object -Unique"#,
        name = ps_quote(name)
    )
}

fn controller_type(kind: ControllerKind) -> &'static str {
    match kind {
        ControllerKind::Ide => "IDE",
        ControllerKind::Scsi => "SCSI",
    }
}

impl Hypervisor for PowerShellHypervisor {
    fn list_clustered_vms(&self) -> Result<Vec<String>> {
        self.query(
            "Get-ClusterGroup | Where-Object { [string]$_.GroupType -eq 'VirtualMachine' } \
             | ForEach-Object { $_.Name }",
        )
    }

    fn read_vm(&self, name: &str) -> Result<VmFacts> {
        self.single(&vm_facts_script(name), &format!("machine '{}'", name))
    }

    fn vm_exists(&self, name: &str) -> Result<bool> {
        let matches: Vec<String> = self.query(&vm_exists_script(name))?;
        Ok(!matches.is_empty())
    }

    fn create_vm(&self, name: &str, generation: u8, memory_startup_bytes: u64) -> Result<()> {
        self.run(&format!(
            "New-VM -Name {} -Generation {} -MemoryStartupBytes {} -NoVHD | Out-Null",
            ps_quote(name),
            generation,
            memory_startup_bytes
        ))
        .map(|_| ())
    }

    fn set_processor_count(&self, name: &str, count: u32) -> Result<()> {
        self.run(&format!(
            "Set-VMProcessor -VMName {} -Count {}",
            ps_quote(name),
            count
        ))
        .map(|_| ())
    }

    fn set_memory(&self, name: &str, memory: &MemoryPolicy) -> Result<()> {
        let script = match *memory {
            MemoryPolicy::Static { startup_bytes } => format!(
                "Set-VMMemory -VMName {} -DynamicMemoryEnabled $false -StartupBytes {}",
                ps_quote(name),
                startup_bytes
            ),
            MemoryPolicy::Dynamic {
                startup_bytes,
                minimum_bytes,
                maximum_bytes,
            } => format!(
                "Set-VMMemory -VMName {} -DynamicMemoryEnabled $true -StartupBytes {} \
                 -MinimumBytes {} -MaximumBytes {}",
                ps_quote(name),
                startup_bytes,
                minimum_bytes,
                maximum_bytes
            ),
        };
        self.run(&script).map(|_| ())
    }

    fn remove_network_adapters(&self, name: &str) -> Result<()> {
        self.run(&format!(
            "Get-VMNetworkAdapter -VMName {} | Remove-VMNetworkAdapter",
            ps_quote(name)
        ))
        .map(|_| ())
    }

    fn add_network_adapter(&self, name: &str, adapter: &str, switch: Option<&str>) -> Result<()> {
        let mut script = format!(
            "Add-VMNetworkAdapter -VMName {} -Name {}",
            ps_quote(name),
            ps_quote(adapter)
        );
        if let Some(switch) = switch {
            script.push_str(&format!(" -SwitchName {}", ps_quote(switch)));
        }
        self.run(&script).map(|_| ())
    }

    fn set_adapter_mac(&self, name: &str, adapter: &str, mac: &str) -> Result<()> {
        self.run(&format!(
            "Set-VMNetworkAdapter -VMName {} -Name {} -StaticMacAddress {}",
            ps_quote(name),
            ps_quote(adapter),
            ps_quote(mac)
        ))
        .map(|_| ())
    }

    fn set_adapter_vlan(&self, name: &str, adapter: &str, vlan: &VlanPolicy) -> Result<()> {
        let target = format!(
            "Set-VMNetworkAdapterVlan -VMName {} -VMNetworkAdapterName {}",
            ps_quote(name),
            ps_quote(adapter)
        );
        let script = match vlan {
            VlanPolicy::None => format!("{} -Untagged", target),
            VlanPolicy::Access(tag) => format!("{} -Access -VlanId {}", target, tag),
            VlanPolicy::Trunk(allowed) => {
                let list: Vec<String> = allowed.iter().map(u16::to_string).collect();
                format!(
                    "{} -Trunk -AllowedVlanIdList {} -NativeVlanId 0",
                    target,
                    ps_quote(&list.join(","))
                )
            }
        };
        self.run(&script).map(|_| ())
    }

    fn add_hard_disk(
        &self,
        name: &str,
        path: &str,
        controller: ControllerKind,
        address: ControllerAddress,
    ) -> Result<()> {
        let vm = ps_quote(name);
        let mut script = String::new();
        if controller == ControllerKind::Scsi {
            // Generation 2 machines start with a single SCSI controller.
            script.push_str(&format!(
                "while (@(Get-VMScsiController -VMName {vm}).Count -le {n}) {{ Add-VMScsiController -VMName {vm} }}; ",
                vm = vm,
                n = address.channel
            ));
        }
        script.push_str(&format!(
            "Add-VMHardDiskDrive -VMName {} -ControllerType {} -ControllerNumber {} -ControllerLocation {} -Path {}",
            vm,
            controller_type(controller),
            address.channel,
            address.slot,
            ps_quote(path)
        ));
        self.run(&script).map(|_| ())
    }
}

impl ClusterMembership for PowerShellHypervisor {
    fn owner_of(&self, group: &str) -> Result<String> {
        self.single(
            &format!(
                "Get-ClusterGroup -Name {} | ForEach-Object {{ [string]$_.OwnerNode.Name }}",
                ps_quote(group)
            ),
            &format!("cluster group '{}'", group),
        )
    }

    fn local_node(&self) -> Result<String> {
        self.single("$env:COMPUTERNAME", "local computer name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_doubles_single_quotes() {
        assert_eq!(ps_quote("SQL01"), "'SQL01'");
        assert_eq!(ps_quote("Bob's VM"), "'Bob''s VM'");
        assert_eq!(ps_quote("$(Remove-Item C:\\)"), "'$(Remove-Item C:\\)'");
    }

    #[test]
    fn facts_script_matches_names_exactly() {
        let script = vm_facts_script("SQL[01]");
        assert!(script.contains("$_.Name -eq 'SQL[01]'"));
        assert!(!script.contains("Get-VM -Name"));
    }

    #[test]
    fn existence_check_covers_the_whole_cluster() {
        let script = vm_exists_script("SQL01_Restored");
        assert!(script.contains("Get-ClusterGroup"));
        assert!(script.contains("[string]$_.GroupType -eq 'VirtualMachine'"));
        assert!(script.contains("Get-VM -ComputerName @(Get-ClusterNode"));
        assert!(script.contains("Get-Command Get-ClusterNode -ErrorAction SilentlyContinue"));
        assert!(script.contains("$_ -eq 'SQL01_Restored'"));
        assert!(!script.contains("-Name"));
    }

    #[test]
    fn existence_check_quotes_the_name() {
        let script = vm_exists_script("Bob's VM");
        assert!(script.contains("$_ -eq 'Bob''s VM'"));
    }

    #[test]
    fn facts_decode_from_powershell_json() {
        let json = r#"[{"Name":"SQL01","Generation":2,"Version":"9.0","ProcessorCount":4,
            "MemoryStartup":4294967296,"DynamicMemoryEnabled":true,"MemoryMinimum":2147483648,
            "MemoryMaximum":8589934592,"OwnerNode":"HV01","Path":"C:\\ClusterStorage\\Volume1\\SQL01",
            "Adapters":[{"Name":"LAN","MacAddress":"00155D010203","DynamicMacAddressEnabled":false,
              "SwitchName":"vSwitch","VlanMode":"Trunk","AccessVlanId":0,"AllowedVlanIdList":"10,20"}],
            "Disks":[{"ControllerType":"SCSI","ControllerNumber":null,"ControllerLocation":1,
              "Path":"C:\\ClusterStorage\\Volume1\\SQL01\\data.vhdx"}]}]"#;
        let facts: Vec<VmFacts> = serde_json::from_str(json).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].adapters[0].vlan_mode.as_deref(), Some("Trunk"));
        assert_eq!(facts[0].disks[0].controller_number, None);
    }
}
