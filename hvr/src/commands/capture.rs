// Scheduled configuration capture

use chrono::{Duration, Utc};
use hvr_capture::{CaptureOptions, CapturePipeline, CaptureReport, LeaderDecision};
use hvr_config::HvrConfig;
use hvr_core::error::{HvrError, Result};
use hvr_core::{hvr_println, hvr_success, hvr_warning};
use hvr_hypervisor::PowerShellHypervisor;
use hvr_messages::{msg, MESSAGES};
use hvr_metadata::MetadataStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn handle_capture(
    config: &HvrConfig,
    destination: Option<PathBuf>,
    retention_days: Option<u32>,
) -> Result<()> {
    let root = destination.unwrap_or_else(|| config.backup.root.clone());
    let days = retention_days.unwrap_or(config.backup.retention_days);
    if days == 0 {
        return Err(HvrError::input("--retention-days must be at least 1"));
    }

    let store = MetadataStore::new(&root);
    let hyperv = PowerShellHypervisor::default();
    let options = CaptureOptions {
        coordination_group: config.backup.coordination_group.clone(),
        retention: Duration::days(i64::from(days)),
    };

    hvr_println!("{}", msg!(MESSAGES.capture.header, root = root.display()));
    let report = CapturePipeline::new(&hyperv, &hyperv, &store, options).run(Utc::now())?;
    print_report(&report, &config.backup.coordination_group, days);
    Ok(())
}

fn print_report(report: &CaptureReport, group: &str, days: u32) {
    match &report.decision {
        LeaderDecision::Authoritative => {}
        LeaderDecision::NotOwner { owner, local } => {
            hvr_println!(
                "{}",
                msg!(MESSAGES.capture.not_authoritative, group = group, owner = owner, local = local)
            );
            return;
        }
        LeaderDecision::Unknown(error) => {
            hvr_warning!("{}", msg!(MESSAGES.capture.gate_failed, group = group, error = error));
            return;
        }
    }

    for (entity, path) in &report.written {
        hvr_println!(
            "{}",
            msg!(MESSAGES.capture.entity_written, entity = entity, path = path.display())
        );
    }
    for (entity, error) in &report.failed {
        hvr_println!("{}", msg!(MESSAGES.capture.entity_failed, entity = entity, error = error));
    }

    let mut pruned: BTreeMap<String, usize> = BTreeMap::new();
    for path in &report.pruned {
        *pruned.entry(entity_of(path)).or_default() += 1;
    }
    for (entity, count) in &pruned {
        hvr_println!(
            "{}",
            msg!(MESSAGES.capture.pruned, entity = entity, count = count, days = days)
        );
    }
    for (path, error) in &report.prune_failures {
        hvr_println!(
            "{}",
            msg!(
                MESSAGES.capture.prune_failed,
                entity = entity_of(path),
                path = path.display(),
                error = error
            )
        );
    }

    hvr_success!(
        "{}",
        msg!(
            MESSAGES.capture.summary,
            written = report.written.len(),
            failed = report.failed.len(),
            pruned = report.pruned.len()
        )
    );
}

/// Record files live in `<root>/<entity>/`
fn entity_of(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_is_the_record_directory() {
        assert_eq!(
            entity_of(Path::new("/backups/SQL01/SQL01_20240501_020000.json")),
            "SQL01"
        );
        assert_eq!(entity_of(Path::new("orphan.json")), "");
    }
}
