//! Single-writer gate for the capture pipeline.
//!
//! Only the node that currently owns the coordination group captures. A failed
//! ownership query means "not authoritative": skipping one cycle is harmless,
//! two writers are not.

use hvr_hypervisor::ClusterMembership;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderDecision {
    Authoritative,
    NotOwner { owner: String, local: String },
    Unknown(String),
}

impl LeaderDecision {
    pub fn decide(cluster: &dyn ClusterMembership, group: &str) -> Self {
        let owner = match cluster.owner_of(group) {
            Ok(owner) => owner,
            Err(e) => {
                error!(group = %group, error = %e, "cluster owner query failed");
                return LeaderDecision::Unknown(e.to_string());
            }
        };
        let local = match cluster.local_node() {
            Ok(local) => local,
            Err(e) => {
                error!(error = %e, "local node name query failed");
                return LeaderDecision::Unknown(e.to_string());
            }
        };

        // Node names are NetBIOS names; compare case-insensitively.
        if !owner.trim().is_empty() && owner.trim().eq_ignore_ascii_case(local.trim()) {
            debug!(group = %group, node = %local, "this node owns the coordination group");
            LeaderDecision::Authoritative
        } else {
            LeaderDecision::NotOwner { owner, local }
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, LeaderDecision::Authoritative)
    }
}

pub fn is_authoritative(cluster: &dyn ClusterMembership, group: &str) -> bool {
    LeaderDecision::decide(cluster, group).is_authoritative()
}
