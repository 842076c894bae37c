// Interactive or flag-driven restore

use super::cleanup::{print_cleanup_report, print_orphan_notice, print_pending_clone};
use super::storage_client;
use crate::prompt::{volume_name, PresetSelector};
use hvr_config::HvrConfig;
use hvr_core::error::{HvrError, Result};
use hvr_core::{hvr_println, hvr_success, hvr_warning};
use hvr_hypervisor::PowerShellHypervisor;
use hvr_messages::{msg, MESSAGES};
use hvr_metadata::MetadataStore;
use hvr_restore::{
    checked_index, Choice, RestoreOrchestrator, RestoreRequest, RestoreSession, SelectionItem,
    Selector,
};
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Prompted from the machines with records when omitted
    pub entity: Option<String>,
    /// Prompted when omitted
    pub volume: Option<String>,
    /// 1-based, newest first
    pub record_index: Option<usize>,
    pub snapshot: Option<String>,
    /// `Some` answers the cleanup question up front
    pub cleanup: Option<bool>,
}

impl RestoreOptions {
    /// Answers in prompt order. The machine prompt only happens without `--entity`.
    fn presets(&self) -> Result<Vec<Option<Choice>>> {
        let record = match self.record_index {
            Some(0) => return Err(HvrError::input("--record-index starts at 1 (newest)")),
            Some(n) => Some(Choice::Index(n - 1)),
            None => None,
        };
        let mut presets = Vec::with_capacity(3);
        if self.entity.is_none() {
            presets.push(None);
        }
        presets.push(record);
        presets.push(self.snapshot.clone().map(Choice::Key));
        Ok(presets)
    }
}

/// `--entity` as given, otherwise a choice among the machines with records
fn resolve_entity(
    store: &MetadataStore,
    entity: Option<String>,
    selector: &mut dyn Selector,
) -> Result<String> {
    if let Some(entity) = entity {
        return Ok(entity);
    }
    let entities = store.entities()?;
    if entities.is_empty() {
        return Err(HvrError::input(format!(
            "no configuration records under {}; run capture first or pass --entity",
            store.root().display()
        )));
    }
    let items: Vec<SelectionItem> = entities
        .iter()
        .map(|name| SelectionItem::new(name.clone(), name.clone()))
        .collect();
    let index = checked_index(selector.choose(MESSAGES.restore.prompt_entity, &items)?, &items)?;
    Ok(entities[index].clone())
}

/// Volume recorded in the newest record of `entity`, offered as the default
fn volume_hint(store: &MetadataStore, entity: &str) -> Option<String> {
    let entries = store.list_for(entity).ok()?;
    let newest = entries.first()?;
    match store.load(newest) {
        Ok(doc) => doc.record.storage_volume,
        Err(e) => {
            debug!(error = %e, "no volume hint");
            None
        }
    }
}

pub fn handle_restore(config: &HvrConfig, options: RestoreOptions) -> Result<()> {
    let mut selector = PresetSelector::new(options.presets()?);
    let store = MetadataStore::new(&config.backup.root);
    let entity = resolve_entity(&store, options.entity.clone(), &mut selector)?;
    let volume = match options.volume.clone() {
        Some(volume) => volume,
        None => {
            let hint = volume_hint(&store, &entity);
            volume_name(
                &msg!(MESSAGES.restore.prompt_volume, entity = &entity),
                hint.as_deref(),
            )?
        }
    };

    let storage = storage_client(config)?;
    let hyperv = PowerShellHypervisor::default();
    let orchestrator = RestoreOrchestrator::new(
        &store,
        &storage,
        &hyperv,
        config.restore.clone(),
        config.storage.share_root.clone(),
    );

    let request = RestoreRequest { entity, volume };
    hvr_println!(
        "{}",
        msg!(MESSAGES.restore.header, entity = &request.entity, volume = &request.volume)
    );

    let mut session = RestoreSession::new();
    let result = orchestrator.run(&request, &mut selector, &mut session);
    match &result {
        Ok(outcome) => {
            hvr_success!(
                "{}",
                msg!(MESSAGES.restore.success, entity = &outcome.entity, target = &outcome.target)
            );
            if !outcome.warnings.is_empty() {
                hvr_warning!(
                    "{}",
                    msg!(MESSAGES.restore.warnings_header, count = outcome.warnings.len())
                );
                for warning in &outcome.warnings {
                    hvr_println!("  - {}", warning);
                }
            }
        }
        Err(e) => error!(stage = %session.stage(), error = %e, "restore failed"),
    }

    let Some(handle) = session.handle().cloned() else {
        if let Some(clone) = session.pending_clone() {
            print_pending_clone(clone);
        }
        return result.map(|_| ());
    };

    let delete = match options.cleanup {
        Some(answer) => answer,
        None => {
            let prompt = msg!(
                MESSAGES.restore.cleanup_prompt,
                share = &handle.share_name,
                clone = handle.clone_name()
            );
            selector.confirm(&prompt).unwrap_or_else(|e| {
                warn!(error = %e, "cleanup confirmation failed; keeping resources");
                false
            })
        }
    };

    if delete {
        if let Some(report) = orchestrator.cleanup(&mut session) {
            print_cleanup_report(&report, &handle);
        }
    } else if result.is_ok() {
        hvr_println!("{}", MESSAGES.restore.cleanup_cancelled);
    }

    // Anything a failed run or a failed cleanup left behind
    if let Some(handle) = session.handle() {
        if result.is_err() || delete {
            print_orphan_notice(handle);
        }
    }
    result.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hvr_metadata::{ConfigurationRecord, MemoryPolicy};
    use hvr_restore::FixedSelector;
    use tempfile::TempDir;

    fn options(record_index: Option<usize>, snapshot: Option<&str>) -> RestoreOptions {
        RestoreOptions {
            entity: Some("SQL01".into()),
            volume: Some("vol_vms".into()),
            record_index,
            snapshot: snapshot.map(str::to_string),
            cleanup: None,
        }
    }

    #[test]
    fn record_index_is_one_based() {
        let presets = options(Some(1), Some("daily_2024")).presets().unwrap();
        assert_eq!(presets[0], Some(Choice::Index(0)));
        assert_eq!(presets[1], Some(Choice::Key("daily_2024".into())));
        assert!(matches!(
            options(Some(0), None).presets(),
            Err(HvrError::Input(_))
        ));
    }

    #[test]
    fn missing_flags_leave_prompts() {
        assert_eq!(options(None, None).presets().unwrap(), vec![None, None]);
    }

    #[test]
    fn missing_entity_is_asked_before_the_record() {
        let mut opts = options(Some(2), Some("daily_2024"));
        opts.entity = None;
        assert_eq!(
            opts.presets().unwrap(),
            vec![
                None,
                Some(Choice::Index(1)),
                Some(Choice::Key("daily_2024".into()))
            ]
        );
    }

    fn store_with(entities: &[(&str, Option<&str>)]) -> (TempDir, MetadataStore) {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        for (entity, volume) in entities {
            let record = ConfigurationRecord {
                entity_name: entity.to_string(),
                owner_node: None,
                storage_volume: volume.map(str::to_string),
                generation: 2,
                config_version: "9.0".into(),
                cpu_count: 2,
                memory: MemoryPolicy::Static {
                    startup_bytes: 2 << 30,
                },
                network_adapters: Vec::new(),
                disks: Vec::new(),
            };
            store.append(&record, at).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn entity_is_chosen_from_machines_with_records() {
        let (_dir, store) = store_with(&[("WEB01", None), ("SQL01", Some("vol_vms"))]);
        let mut selector = FixedSelector::new().then_choose(Choice::Key("WEB01".into()));

        let entity = resolve_entity(&store, None, &mut selector).unwrap();
        assert_eq!(entity, "WEB01");
        assert_eq!(selector.prompts, vec![MESSAGES.restore.prompt_entity.to_string()]);
    }

    #[test]
    fn entity_flag_skips_the_prompt() {
        let (_dir, store) = store_with(&[("SQL01", None)]);
        let mut selector = FixedSelector::new();

        let entity = resolve_entity(&store, Some("SQL01".into()), &mut selector).unwrap();
        assert_eq!(entity, "SQL01");
        assert!(selector.prompts.is_empty());
    }

    #[test]
    fn empty_store_fails_before_prompting() {
        let (_dir, store) = store_with(&[]);
        let mut selector = FixedSelector::new();

        assert!(matches!(
            resolve_entity(&store, None, &mut selector),
            Err(HvrError::Input(_))
        ));
        assert!(selector.prompts.is_empty());
    }

    #[test]
    fn volume_hint_comes_from_the_newest_record() {
        let (_dir, store) = store_with(&[("SQL01", Some("vol_vms")), ("WEB01", None)]);
        assert_eq!(volume_hint(&store, "SQL01").as_deref(), Some("vol_vms"));
        assert_eq!(volume_hint(&store, "WEB01"), None);
        assert_eq!(volume_hint(&store, "DC01"), None);
    }
}
