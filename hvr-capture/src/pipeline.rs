use crate::leader::LeaderDecision;
use crate::snapshotter::Snapshotter;
use chrono::{DateTime, Duration, Utc};
use hvr_core::error::{HvrError, Result};
use hvr_hypervisor::{ClusterMembership, Hypervisor};
use hvr_metadata::MetadataStore;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Cluster group whose owner is the single writer
    pub coordination_group: String,
    pub retention: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            coordination_group: "Cluster Group".to_string(),
            retention: Duration::days(30),
        }
    }
}

/// What one capture pass did
#[derive(Debug)]
pub struct CaptureReport {
    pub decision: LeaderDecision,
    pub written: Vec<(String, PathBuf)>,
    pub failed: Vec<(String, HvrError)>,
    pub pruned: Vec<PathBuf>,
    pub prune_failures: Vec<(PathBuf, HvrError)>,
}

impl CaptureReport {
    fn skipped(decision: LeaderDecision) -> Self {
        Self {
            decision,
            written: Vec::new(),
            failed: Vec::new(),
            pruned: Vec::new(),
            prune_failures: Vec::new(),
        }
    }
}

pub struct CapturePipeline<'a> {
    hypervisor: &'a dyn Hypervisor,
    cluster: &'a dyn ClusterMembership,
    store: &'a MetadataStore,
    options: CaptureOptions,
}

impl<'a> CapturePipeline<'a> {
    pub fn new(
        hypervisor: &'a dyn Hypervisor,
        cluster: &'a dyn ClusterMembership,
        store: &'a MetadataStore,
        options: CaptureOptions,
    ) -> Self {
        Self {
            hypervisor,
            cluster,
            store,
            options,
        }
    }

    /// Gate, capture, write, then prune.
    ///
    /// Errors only for setup failures: an unreachable backup root or a failed
    /// machine enumeration. Per-machine problems land in the report. Retention
    /// runs after all writes and only for machines whose new record was written.
    pub fn run(&self, now: DateTime<Utc>) -> Result<CaptureReport> {
        let decision = LeaderDecision::decide(self.cluster, &self.options.coordination_group);
        if !decision.is_authoritative() {
            info!(group = %self.options.coordination_group, ?decision, "not the capture writer; skipping");
            return Ok(CaptureReport::skipped(decision));
        }

        let root = self.store.root();
        fs::create_dir_all(root)
            .map_err(|e| HvrError::filesystem(e, root.to_string_lossy(), "create_dir_all"))?;

        let outcome = Snapshotter::new(self.hypervisor).capture_all()?;
        let mut report = CaptureReport::skipped(decision);
        report.failed = outcome.failures;

        for record in &outcome.records {
            match self.store.append(record, now) {
                Ok(path) => {
                    info!(entity = %record.entity_name, path = %path.display(), "record written");
                    report.written.push((record.entity_name.clone(), path));
                }
                Err(e) => {
                    warn!(entity = %record.entity_name, error = %e, "record not written");
                    report.failed.push((record.entity_name.clone(), e));
                }
            }
        }

        for (entity, _) in &report.written {
            match self.store.prune(entity, self.options.retention, now) {
                Ok(pruned) => {
                    report.pruned.extend(pruned.deleted);
                    report.prune_failures.extend(pruned.failed);
                }
                Err(e) => {
                    warn!(entity = %entity, error = %e, "retention pass failed");
                    report.prune_failures.push((self.store.root().join(entity), e));
                }
            }
        }

        info!(
            written = report.written.len(),
            failed = report.failed.len(),
            pruned = report.pruned.len(),
            "capture complete"
        );
        Ok(report)
    }
}
