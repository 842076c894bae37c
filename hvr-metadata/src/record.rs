use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest VLAN id a switch port accepts
pub const MAX_VLAN_ID: u16 = 4094;

/// Desired configuration of one machine at capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationRecord {
    pub entity_name: String,
    /// Node that owned the machine when captured. Informational only.
    #[serde(deserialize_with = "Option::deserialize")]
    pub owner_node: Option<String>,
    /// Volume the machine lived on when captured. A hint, restore asks separately.
    #[serde(deserialize_with = "Option::deserialize")]
    pub storage_volume: Option<String>,
    pub generation: u8,
    pub config_version: String,
    pub cpu_count: u32,
    pub memory: MemoryPolicy,
    pub network_adapters: Vec<NetworkAdapterSpec>,
    pub disks: Vec<DiskSpec>,
}

impl ConfigurationRecord {
    /// Semantic checks serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.entity_name.trim().is_empty() {
            return Err("entity_name is empty".into());
        }
        if !matches!(self.generation, 1 | 2) {
            return Err(format!("generation must be 1 or 2, got {}", self.generation));
        }
        if self.cpu_count == 0 {
            return Err("cpu_count must be at least 1".into());
        }
        self.memory.validate()?;
        for adapter in &self.network_adapters {
            if let Some(mac) = &adapter.mac_address {
                if !is_valid_mac(mac) {
                    return Err(format!(
                        "adapter '{}' has an invalid MAC address '{}'",
                        adapter.name, mac
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Static amount, or dynamic with bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase", deny_unknown_fields)]
pub enum MemoryPolicy {
    Static {
        startup_bytes: u64,
    },
    Dynamic {
        startup_bytes: u64,
        minimum_bytes: u64,
        maximum_bytes: u64,
    },
}

impl MemoryPolicy {
    pub fn startup_bytes(&self) -> u64 {
        match self {
            MemoryPolicy::Static { startup_bytes } | MemoryPolicy::Dynamic { startup_bytes, .. } => {
                *startup_bytes
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            MemoryPolicy::Static { startup_bytes: 0 } => Err("startup memory is zero".into()),
            MemoryPolicy::Static { .. } => Ok(()),
            MemoryPolicy::Dynamic {
                startup_bytes,
                minimum_bytes,
                maximum_bytes,
            } => {
                if minimum_bytes == 0 || minimum_bytes > startup_bytes || startup_bytes > maximum_bytes {
                    Err(format!(
                        "dynamic memory bounds must satisfy 0 < minimum <= startup <= maximum \
                         (minimum {}, startup {}, maximum {})",
                        minimum_bytes, startup_bytes, maximum_bytes
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// VLAN policy of a network adapter.
///
/// A trunk always carries at least one allowed tag; building or decoding a
/// trunk with no tags yields `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "VlanDocument", into = "VlanDocument")]
pub enum VlanPolicy {
    #[default]
    None,
    Access(u16),
    Trunk(Vec<u16>),
}

impl VlanPolicy {
    /// Trunk over `allowed`, deduplicated in first-seen order
    pub fn trunk(allowed: impl IntoIterator<Item = u16>) -> Self {
        let mut tags: Vec<u16> = Vec::new();
        for tag in allowed {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.is_empty() {
            VlanPolicy::None
        } else {
            VlanPolicy::Trunk(tags)
        }
    }

    /// Access port; tag 0 means untagged
    pub fn access(tag: u16) -> Self {
        if tag == 0 {
            VlanPolicy::None
        } else {
            VlanPolicy::Access(tag)
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, VlanPolicy::None)
    }
}

impl fmt::Display for VlanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VlanPolicy::None => write!(f, "untagged"),
            VlanPolicy::Access(tag) => write!(f, "access {}", tag),
            VlanPolicy::Trunk(tags) => {
                let list: Vec<String> = tags.iter().map(u16::to_string).collect();
                write!(f, "trunk {}", list.join(","))
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase", deny_unknown_fields)]
enum VlanDocument {
    None,
    Access { tag: u16 },
    Trunk { allowed: Vec<u16> },
}

fn check_tag(tag: u16) -> Result<u16, String> {
    if (1..=MAX_VLAN_ID).contains(&tag) {
        Ok(tag)
    } else {
        Err(format!("VLAN id {} is outside 1..={}", tag, MAX_VLAN_ID))
    }
}

impl TryFrom<VlanDocument> for VlanPolicy {
    type Error = String;

    fn try_from(doc: VlanDocument) -> Result<Self, Self::Error> {
        match doc {
            VlanDocument::None => Ok(VlanPolicy::None),
            VlanDocument::Access { tag } => check_tag(tag).map(VlanPolicy::Access),
            VlanDocument::Trunk { allowed } => {
                let tags = allowed
                    .into_iter()
                    .map(check_tag)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(VlanPolicy::trunk(tags))
            }
        }
    }
}

impl From<VlanPolicy> for VlanDocument {
    fn from(policy: VlanPolicy) -> Self {
        match policy {
            VlanPolicy::None => VlanDocument::None,
            VlanPolicy::Access(tag) => VlanDocument::Access { tag },
            VlanPolicy::Trunk(allowed) => VlanDocument::Trunk { allowed },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkAdapterSpec {
    pub name: String,
    /// Static MAC as 12 hex digits; `None` means assign automatically
    #[serde(deserialize_with = "Option::deserialize")]
    pub mac_address: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub switch_name: Option<String>,
    pub vlan: VlanPolicy,
}

/// Bus type of a virtual disk controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Ide,
    Scsi,
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerKind::Ide => write!(f, "IDE"),
            ControllerKind::Scsi => write!(f, "SCSI"),
        }
    }
}

/// Controller number and slot on that controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerAddress {
    pub channel: u32,
    pub slot: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiskSpec {
    pub controller: ControllerKind,
    pub address: ControllerAddress,
    /// Path at capture time. Only the leaf name is used on restore.
    pub path: String,
}

impl DiskSpec {
    /// File name of `path`, splitting on both `\` and `/`
    pub fn leaf_name(&self) -> Option<&str> {
        leaf_name(&self.path)
    }
}

/// Last non-empty component of a Windows or POSIX style path
pub fn leaf_name(path: &str) -> Option<&str> {
    path.rsplit(['\\', '/']).find(|part| !part.is_empty())
}

/// 12 hex digits, optionally separated by `-` or `:`
pub fn is_valid_mac(mac: &str) -> bool {
    let digits: Vec<char> = mac.chars().filter(|c| *c != '-' && *c != ':').collect();
    digits.len() == 12 && digits.iter().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trunk_without_tags_is_none() {
        assert_eq!(VlanPolicy::trunk(Vec::new()), VlanPolicy::None);
        assert_eq!(
            VlanPolicy::trunk([10, 20, 10, 30]),
            VlanPolicy::Trunk(vec![10, 20, 30])
        );
    }

    #[test]
    fn vlan_json_shape() {
        let json = serde_json::to_value(VlanPolicy::Trunk(vec![10, 20])).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "trunk", "allowed": [10, 20]}));

        let json = serde_json::to_value(VlanPolicy::Access(120)).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "access", "tag": 120}));

        let json = serde_json::to_value(VlanPolicy::None).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "none"}));
    }

    #[test]
    fn empty_trunk_decodes_as_none() {
        let policy: VlanPolicy =
            serde_json::from_str(r#"{"mode":"trunk","allowed":[]}"#).unwrap();
        assert_eq!(policy, VlanPolicy::None);
    }

    #[test]
    fn out_of_range_vlan_is_a_parse_error() {
        assert!(serde_json::from_str::<VlanPolicy>(r#"{"mode":"access","tag":4095}"#).is_err());
        assert!(serde_json::from_str::<VlanPolicy>(r#"{"mode":"trunk","allowed":[0]}"#).is_err());
        assert!(serde_json::from_str::<VlanPolicy>(r#"{"mode":"bridge"}"#).is_err());
    }

    #[test]
    fn leaf_name_handles_both_separators() {
        let disk = DiskSpec {
            controller: ControllerKind::Scsi,
            address: ControllerAddress { channel: 0, slot: 1 },
            path: r"C:\ClusterStorage\Volume1\VMs\SQL01\SQL01_Data.vhdx".into(),
        };
        assert_eq!(disk.leaf_name(), Some("SQL01_Data.vhdx"));
        assert_eq!(leaf_name("/mnt/clone/SQL01/os.vhdx"), Some("os.vhdx"));
        assert_eq!(leaf_name(r"C:\VMs\SQL01\"), Some("SQL01"));
        assert_eq!(leaf_name(""), None);
    }

    #[test]
    fn dynamic_memory_bounds_are_checked() {
        let ok = MemoryPolicy::Dynamic {
            startup_bytes: 4 << 30,
            minimum_bytes: 2 << 30,
            maximum_bytes: 8 << 30,
        };
        assert!(ok.validate().is_ok());
        let inverted = MemoryPolicy::Dynamic {
            startup_bytes: 4 << 30,
            minimum_bytes: 8 << 30,
            maximum_bytes: 2 << 30,
        };
        assert!(inverted.validate().is_err());
        assert!(MemoryPolicy::Static { startup_bytes: 0 }.validate().is_err());
    }

    #[test]
    fn mac_format() {
        assert!(is_valid_mac("00155D010203"));
        assert!(is_valid_mac("00-15-5D-01-02-03"));
        assert!(!is_valid_mac("00155D0102"));
        assert!(!is_valid_mac("00155D01020G"));
    }
}
