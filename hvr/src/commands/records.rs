// Read-only listing of stored records

use hvr_config::HvrConfig;
use hvr_core::error::Result;
use hvr_core::hvr_println;
use hvr_messages::{msg, MESSAGES};
use hvr_metadata::MetadataStore;

pub fn handle_records(config: &HvrConfig, entity: &str) -> Result<()> {
    let store = MetadataStore::new(&config.backup.root);
    let entries = store.list_for(entity)?;
    if entries.is_empty() {
        hvr_println!("{}", msg!(MESSAGES.restore.records_empty, entity = entity));
        return Ok(());
    }

    hvr_println!("{}", MESSAGES.restore.records_header);
    hvr_println!("{}", MESSAGES.restore.records_separator);
    for (i, entry) in entries.iter().enumerate() {
        hvr_println!(
            "{:<4} {:<49} {}",
            i + 1,
            entry.label(),
            entry.captured_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
