use crate::StorageSnapshot;

/// Name prefixes of infrastructure-owned snapshots (SVM-level and replication).
/// Matched case-sensitively.
pub const RESERVED_PREFIXES: [&str; 2] = ["vserver", "snapmirror"];

/// Whether an operator may restore from a snapshot with this name
pub fn is_eligible(name: &str) -> bool {
    !RESERVED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Keep only restorable snapshots, preserving order
pub fn eligible_snapshots(snapshots: Vec<StorageSnapshot>) -> Vec<StorageSnapshot> {
    snapshots
        .into_iter()
        .filter(|s| is_eligible(&s.name))
        .collect()
}
