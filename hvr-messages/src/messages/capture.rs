//! Capture pipeline messages

pub struct CaptureMessages {
    pub entity_failed: &'static str,
    pub entity_written: &'static str,
    pub gate_failed: &'static str,
    pub header: &'static str,
    pub not_authoritative: &'static str,
    pub prune_failed: &'static str,
    pub pruned: &'static str,
    pub summary: &'static str,
}

pub const CAPTURE_MESSAGES: CaptureMessages = CaptureMessages {
    entity_failed: "  ⚠️  {entity}: {error}",
    entity_written: "  ✓ {entity} → {path}",
    gate_failed: "Skipping capture: could not determine the owner of '{group}': {error}",
    header: "📸 Capturing clustered machine configuration into {root}",
    not_authoritative: "Skipping capture: '{group}' is owned by {owner}, this node is {local}",
    prune_failed: "  ⚠️  {entity}: could not remove {path}: {error}",
    pruned: "  🧹 {entity}: removed {count} record(s) older than {days} day(s)",
    summary: "Capture complete: {written} written, {failed} failed, {pruned} pruned",
};
