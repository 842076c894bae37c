//! On-disk form of a configuration record

use crate::record::ConfigurationRecord;
use chrono::{DateTime, Utc};
use hvr_core::error::{HvrError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format version written into every document
pub const DOCUMENT_VERSION: &str = "1.0";

/// One capture of one machine, as stored in `<entity>_<yyyyMMdd_HHmmss>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDocument {
    pub version: String,
    pub captured_at: DateTime<Utc>,
    pub record: ConfigurationRecord,
}

impl RecordDocument {
    pub fn new(record: ConfigurationRecord, captured_at: DateTime<Utc>) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            captured_at,
            record,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HvrError::Serialization(format!("Failed to serialize record: {}", e)))
    }

    /// Parse and check a document. Unknown versions, missing or mistyped
    /// fields and inconsistent values are all errors.
    pub fn from_json(content: &str, source: &Path) -> Result<Self> {
        let doc: Self = serde_json::from_str(content).map_err(|e| {
            HvrError::Serialization(format!("Invalid record {}: {}", source.display(), e))
        })?;

        if doc.version != DOCUMENT_VERSION {
            return Err(HvrError::Serialization(format!(
                "Record {} has unsupported version '{}' (expected '{}')",
                source.display(),
                doc.version,
                DOCUMENT_VERSION
            )));
        }
        doc.record.validate().map_err(|reason| {
            HvrError::Serialization(format!("Invalid record {}: {}", source.display(), reason))
        })?;

        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HvrError::filesystem(e, path.to_string_lossy(), "read"))?;
        Self::from_json(&content, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemoryPolicy, VlanPolicy};
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "version": "1.0",
            "captured_at": "2024-05-01T02:00:00Z",
            "record": {
                "entity_name": "SQL01",
                "owner_node": "HV01",
                "storage_volume": "vol_vms",
                "generation": 2,
                "config_version": "9.0",
                "cpu_count": 4,
                "memory": {"mode": "static", "startup_bytes": 8589934592u64},
                "network_adapters": [
                    {"name": "LAN", "mac_address": null, "switch_name": "vSwitch", "vlan": {"mode": "access", "tag": 120}}
                ],
                "disks": [
                    {"controller": "scsi", "address": {"channel": 0, "slot": 0}, "path": "C:\\VMs\\SQL01\\SQL01.vhdx"}
                ]
            }
        })
    }

    #[test]
    fn parses_a_complete_document() {
        let doc = RecordDocument::from_json(&sample().to_string(), Path::new("t.json")).unwrap();
        assert_eq!(doc.record.cpu_count, 4);
        assert_eq!(doc.record.memory, MemoryPolicy::Static { startup_bytes: 8 << 30 });
        assert_eq!(doc.record.network_adapters[0].vlan, VlanPolicy::Access(120));
        assert_eq!(doc.record.disks.len(), 1);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut value = sample();
        value["version"] = json!("2.0");
        let err = RecordDocument::from_json(&value.to_string(), Path::new("t.json")).unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[test]
    fn missing_or_mistyped_fields_are_rejected() {
        let mut missing = sample();
        missing["record"].as_object_mut().unwrap().remove("disks");
        assert!(RecordDocument::from_json(&missing.to_string(), Path::new("t.json")).is_err());

        let mut no_owner = sample();
        no_owner["record"].as_object_mut().unwrap().remove("owner_node");
        assert!(RecordDocument::from_json(&no_owner.to_string(), Path::new("t.json")).is_err());

        let mut no_mac = sample();
        no_mac["record"]["network_adapters"][0]
            .as_object_mut()
            .unwrap()
            .remove("mac_address");
        assert!(RecordDocument::from_json(&no_mac.to_string(), Path::new("t.json")).is_err());

        let mut mistyped = sample();
        mistyped["record"]["cpu_count"] = json!("four");
        assert!(RecordDocument::from_json(&mistyped.to_string(), Path::new("t.json")).is_err());

        let mut zero_cpu = sample();
        zero_cpu["record"]["cpu_count"] = json!(0);
        assert!(RecordDocument::from_json(&zero_cpu.to_string(), Path::new("t.json")).is_err());
    }
}
