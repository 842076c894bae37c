//! Names for resources this tool provisions.
//!
//! Shares are always `SHARE_PREFIX` + clone name, so a share can be found
//! from the clone name alone even when its identifier was lost.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SHARE_PREFIX: &str = "hvr_";

/// `<volume>_clone_<yyyyMMddHHmmss>_<8 hex>`; the random tail keeps two
/// restores of the same volume in the same second apart.
pub fn clone_name(volume: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_clone_{}_{}",
        volume,
        now.format("%Y%m%d%H%M%S"),
        &suffix[..8]
    )
}

/// Whether `name` has the shape [`clone_name`] produces. Cleanup by name
/// refuses anything else so it can never target a production volume.
pub fn is_clone_name(name: &str) -> bool {
    let Some((rest, suffix)) = name.rsplit_once('_') else {
        return false;
    };
    let Some((rest, stamp)) = rest.rsplit_once('_') else {
        return false;
    };
    let Some(volume) = rest.strip_suffix("_clone") else {
        return false;
    };
    !volume.is_empty()
        && stamp.len() == 14
        && stamp.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == 8
        && suffix.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn share_name(clone: &str) -> String {
    format!("{}{}", SHARE_PREFIX, clone)
}

/// Namespace path a clone is mounted at inside its SVM
pub fn junction_path(clone: &str) -> String {
    format!("/{}", clone)
}

/// Where the share's files are reachable from this host
pub fn mount_path(share_root: &str, share: &str) -> PathBuf {
    Path::new(share_root).join(share)
}
