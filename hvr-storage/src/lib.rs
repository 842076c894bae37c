//! Storage controller client.
//!
//! A thin, retry-free wrapper over the controller's management REST API:
//! volume lookup, snapshot listing, clone and share provisioning, and their
//! teardown. Every failed call surfaces the HTTP status and body verbatim.
//!
//! The restore orchestrator only sees the [`StorageApi`] trait; [`OntapClient`]
//! is the production implementation.

use chrono::{DateTime, Utc};
use hvr_core::error::Result;
use serde::Deserialize;
use std::fmt;

pub mod connection;
pub mod eligibility;
pub mod naming;
pub mod ontap;

pub use connection::StorageConnection;
pub use eligibility::{eligible_snapshots, is_eligible, RESERVED_PREFIXES};
pub use naming::{clone_name, is_clone_name, junction_path, mount_path, share_name, SHARE_PREFIX};
pub use ontap::OntapClient;

/// A volume as identified by the controller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeId {
    pub uuid: String,
    pub name: String,
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)
    }
}

/// Read-only point-in-time image of a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSnapshot {
    pub name: String,
    pub create_time: DateTime<Utc>,
    pub volume: VolumeId,
}

/// A clone volume created from a snapshot
pub type CloneId = VolumeId;

/// A CIFS share. The owning SVM is part of the resource path when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareId {
    pub name: String,
    pub svm_uuid: Option<String>,
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.svm_uuid {
            Some(svm) => write!(f, "{}/{}", svm, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Operations the restore pipeline needs from the storage controller.
///
/// Each call is a single request with no internal retry.
pub trait StorageApi {
    /// Resolve a volume by exact name; `NotFound` when absent
    fn find_volume(&self, name: &str) -> Result<VolumeId>;

    /// All snapshots of a volume, unfiltered
    fn list_snapshots(&self, volume: &VolumeId) -> Result<Vec<StorageSnapshot>>;

    fn create_clone(
        &self,
        name: &str,
        parent: &VolumeId,
        snapshot: &StorageSnapshot,
    ) -> Result<CloneId>;

    /// Expose `path` (a junction path inside the SVM namespace) as a share
    fn create_share(&self, name: &str, path: &str) -> Result<ShareId>;

    /// Resolve a share by exact name; `NotFound` when absent
    fn find_share(&self, name: &str) -> Result<ShareId>;

    /// Succeeds when the share is already gone
    fn delete_share(&self, share: &ShareId) -> Result<()>;

    /// Succeeds when the clone is already gone
    fn delete_clone(&self, clone: &CloneId) -> Result<()>;
}
