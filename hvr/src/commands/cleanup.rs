// Teardown of clones and shares left by a restore

use super::storage_client;
use crate::prompt::DialoguerSelector;
use hvr_config::HvrConfig;
use hvr_core::error::{HvrError, Result};
use hvr_core::{hvr_info, hvr_println, hvr_warning};
use hvr_messages::{msg, MESSAGES};
use hvr_restore::{cleanup, locate_orphan, CleanupReport, CleanupStep, CloneHandle, Selector};
use hvr_storage::is_clone_name;

pub fn handle_cleanup(config: &HvrConfig, clone_name: &str, yes: bool) -> Result<()> {
    // Checked before any credentials are asked for
    if !is_clone_name(clone_name) {
        return Err(HvrError::input(format!(
            "'{}' is not a clone created by hvr; refusing to delete it",
            clone_name
        )));
    }

    let storage = storage_client(config)?;
    let Some(handle) = locate_orphan(&storage, clone_name, &config.storage.share_root)? else {
        hvr_println!("{}", msg!(MESSAGES.restore.cleanup_nothing_found, clone = clone_name));
        return Ok(());
    };

    if !yes {
        let prompt = msg!(
            MESSAGES.restore.cleanup_prompt,
            share = &handle.share_name,
            clone = handle.clone_name()
        );
        if !DialoguerSelector::new().confirm(&prompt)? {
            hvr_info!("{}", MESSAGES.restore.cleanup_cancelled);
            return Ok(());
        }
    }

    let report = cleanup(&storage, &handle);
    print_cleanup_report(&report, &handle);
    if !report.is_clean() {
        print_orphan_notice(&handle);
    }
    match (report.share, report.clone) {
        (CleanupStep::Failed(e), _) | (_, CleanupStep::Failed(e)) => Err(e),
        _ => Ok(()),
    }
}

pub(crate) fn print_cleanup_report(report: &CleanupReport, handle: &CloneHandle) {
    match &report.share {
        CleanupStep::Deleted => {
            hvr_println!(
                "{}",
                msg!(MESSAGES.restore.cleanup_share_deleted, share = &handle.share_name)
            )
        }
        CleanupStep::NotPresent => {}
        CleanupStep::Failed(e) => {
            hvr_warning!(
                "{}",
                msg!(MESSAGES.restore.cleanup_share_failed, share = &handle.share_name, error = e)
            )
        }
    }
    match &report.clone {
        CleanupStep::Deleted => {
            hvr_println!(
                "{}",
                msg!(MESSAGES.restore.cleanup_clone_deleted, clone = handle.clone_name())
            )
        }
        CleanupStep::NotPresent => {}
        CleanupStep::Failed(e) => {
            hvr_warning!(
                "{}",
                msg!(MESSAGES.restore.cleanup_clone_failed, clone = handle.clone_name(), error = e)
            )
        }
    }
}

/// Name every resource still on storage and how to remove it
pub(crate) fn print_orphan_notice(handle: &CloneHandle) {
    let share_id = handle
        .share
        .as_ref()
        .map(|share| share.to_string())
        .unwrap_or_else(|| "not created".to_string());
    hvr_warning!(
        "{}",
        msg!(
            MESSAGES.restore.orphan_notice,
            clone = handle.clone_name(),
            clone_id = &handle.clone.uuid,
            share = &handle.share_name,
            share_id = share_id
        )
    );
    hvr_info!("{}", msg!(MESSAGES.restore.orphan_hint, clone = handle.clone_name()));
}

/// A clone storage may have made even though creating it failed
pub(crate) fn print_pending_clone(clone: &str) {
    hvr_warning!("{}", msg!(MESSAGES.restore.orphan_pending, clone = clone));
    hvr_info!("{}", msg!(MESSAGES.restore.orphan_hint, clone = clone));
}
