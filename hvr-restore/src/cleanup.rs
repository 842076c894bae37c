//! Teardown of a clone and its share.
//!
//! Only ever called for resources a restore created: either a live
//! [`CloneHandle`], or an orphan located by a clone name this tool generated.
//! The share goes first, then the clone; each is attempted regardless of the
//! other.

use crate::orchestrator::CloneHandle;
use hvr_core::error::{HvrError, Result};
use hvr_storage::{is_clone_name, mount_path, share_name, ShareId, StorageApi};
use tracing::{info, warn};

#[derive(Debug)]
pub enum CleanupStep {
    Deleted,
    /// Nothing to delete, e.g. the share was never created
    NotPresent,
    Failed(HvrError),
}

impl CleanupStep {
    pub fn is_failure(&self) -> bool {
        matches!(self, CleanupStep::Failed(_))
    }
}

#[derive(Debug)]
pub struct CleanupReport {
    pub share: CleanupStep,
    pub clone: CleanupStep,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        !self.share.is_failure() && !self.clone.is_failure()
    }
}

pub fn cleanup(storage: &dyn StorageApi, handle: &CloneHandle) -> CleanupReport {
    let share = match resolve_share(storage, handle) {
        Ok(Some(share)) => match storage.delete_share(&share) {
            Ok(()) => CleanupStep::Deleted,
            Err(e) => {
                warn!(share = %share, error = %e, "share deletion failed");
                CleanupStep::Failed(e)
            }
        },
        Ok(None) => CleanupStep::NotPresent,
        Err(e) => {
            warn!(share = %handle.share_name, error = %e, "share lookup failed");
            CleanupStep::Failed(e)
        }
    };

    let clone = match storage.delete_clone(&handle.clone) {
        Ok(()) => CleanupStep::Deleted,
        Err(e) => {
            warn!(clone = %handle.clone, error = %e, "clone deletion failed");
            CleanupStep::Failed(e)
        }
    };

    info!(clone = %handle.clone.name, share = ?share, clone_result = ?clone, "cleanup finished");
    CleanupReport { share, clone }
}

/// The handle's share id, or a lookup by its derived name when the id was
/// never returned
fn resolve_share(storage: &dyn StorageApi, handle: &CloneHandle) -> Result<Option<ShareId>> {
    if let Some(share) = &handle.share {
        return Ok(Some(share.clone()));
    }
    match storage.find_share(&handle.share_name) {
        Ok(share) => Ok(Some(share)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Rebuild a handle for an orphaned clone from its name alone.
///
/// Refuses names this tool could not have generated. Returns `None` when
/// the clone no longer exists.
pub fn locate_orphan(
    storage: &dyn StorageApi,
    clone_name: &str,
    share_root: &str,
) -> Result<Option<CloneHandle>> {
    if !is_clone_name(clone_name) {
        return Err(HvrError::input(format!(
            "'{}' is not a clone created by hvr; refusing to delete it",
            clone_name
        )));
    }

    let clone = match storage.find_volume(clone_name) {
        Ok(clone) => clone,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    let share_name = share_name(clone_name);
    let share = match storage.find_share(&share_name) {
        Ok(share) => Some(share),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    Ok(Some(CloneHandle {
        clone,
        mount_path: mount_path(share_root, &share_name),
        share_name,
        share,
    }))
}
