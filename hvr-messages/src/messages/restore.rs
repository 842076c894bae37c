//! Restore, record listing and cleanup messages

pub struct RestoreMessages {
    // ============================================================================
    // Record listing
    // ============================================================================
    pub records_empty: &'static str,
    pub records_header: &'static str,
    pub records_separator: &'static str,

    // ============================================================================
    // Restore pipeline
    // ============================================================================
    pub clone_created: &'static str,
    pub header: &'static str,
    pub password_prompt: &'static str,
    pub prompt_entity: &'static str,
    pub prompt_record: &'static str,
    pub prompt_snapshot: &'static str,
    pub prompt_volume: &'static str,
    pub share_created: &'static str,
    pub success: &'static str,
    pub target_renamed: &'static str,
    pub validated: &'static str,
    pub warnings_header: &'static str,

    // ============================================================================
    // Orphans and cleanup
    // ============================================================================
    pub cleanup_cancelled: &'static str,
    pub cleanup_clone_deleted: &'static str,
    pub cleanup_clone_failed: &'static str,
    pub cleanup_nothing_found: &'static str,
    pub cleanup_prompt: &'static str,
    pub cleanup_share_deleted: &'static str,
    pub cleanup_share_failed: &'static str,
    pub orphan_hint: &'static str,
    pub orphan_notice: &'static str,
    pub orphan_pending: &'static str,
}

pub const RESTORE_MESSAGES: RestoreMessages = RestoreMessages {
    records_empty: "No configuration records found for '{entity}'.",
    records_header: "#    RECORD                                            CAPTURED (UTC)",
    records_separator: "──────────────────────────────────────────────────────────────────────────",

    clone_created: "  ✓ Created clone '{clone}' from snapshot '{snapshot}'",
    header: "🔁 Restoring '{entity}' from volume '{volume}'",
    password_prompt: "Storage password for {user}@{endpoint}",
    prompt_entity: "Select the machine to restore",
    prompt_record: "Select a configuration record for '{entity}'",
    prompt_snapshot: "Select a snapshot of volume '{volume}'",
    prompt_volume: "Storage volume holding '{entity}'",
    share_created: "  ✓ Created share '{share}' at {path}",
    success: "Restored '{entity}' as '{target}'",
    target_renamed: "'{name}' already exists, restoring as '{target}'",
    validated: "  ✓ Found {count} disk file(s) for '{entity}' in the clone",
    warnings_header: "Restore finished with {count} warning(s):",

    cleanup_cancelled: "Cleanup skipped. Clone and share were kept.",
    cleanup_clone_deleted: "  ✓ Deleted clone '{clone}'",
    cleanup_clone_failed: "  ⚠️  Could not delete clone '{clone}': {error}",
    cleanup_nothing_found: "Clone '{clone}' was not found on storage; nothing to clean up.",
    cleanup_prompt: "Delete share '{share}' and clone '{clone}' now?",
    cleanup_share_deleted: "  ✓ Deleted share '{share}'",
    cleanup_share_failed: "  ⚠️  Could not delete share '{share}': {error}",
    orphan_hint: "💡 Remove them later with: hvr cleanup --clone {clone}",
    orphan_notice: "Orphaned resources: clone '{clone}' ({clone_id}), share '{share}' ({share_id})",
    orphan_pending: "Clone '{clone}' was requested but never confirmed; it may exist on storage",
};
