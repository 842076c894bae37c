// Command handlers

use crate::cli::{Args, Command};
use crate::prompt::storage_password;
use hvr_config::{ConfigLoader, HvrConfig};
use hvr_core::error::Result;
use hvr_core::{hvr_info, hvr_warning};
use hvr_messages::{msg, MESSAGES};
use hvr_storage::{OntapClient, StorageConnection};
use tracing::debug;

pub mod capture;
pub mod cleanup;
pub mod records;
pub mod restore;

/// Main command dispatcher
#[must_use = "command execution results should be handled"]
pub fn execute_command(args: Args) -> Result<()> {
    let config = ConfigLoader::new(args.config.clone()).load()?;
    if args.debug {
        match &config.source_path {
            Some(path) => {
                hvr_info!("{}", msg!(MESSAGES.common.config_loaded, path = path.display()))
            }
            None => {
                let path = hvr_core::paths::default_config_file()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                hvr_info!("{}", msg!(MESSAGES.common.config_defaults, path = path))
            }
        }
    }

    match args.command {
        Command::Capture {
            destination,
            retention_days,
        } => {
            debug!("Handling capture command");
            capture::handle_capture(&config, destination, retention_days)
        }
        Command::Records { entity } => {
            debug!(entity = %entity, "Handling records command");
            records::handle_records(&config, &entity)
        }
        Command::Restore {
            entity,
            volume,
            record_index,
            snapshot,
            cleanup,
            yes,
        } => {
            debug!(entity = ?entity, volume = ?volume, "Handling restore command");
            let options = restore::RestoreOptions {
                entity,
                volume,
                record_index,
                snapshot,
                cleanup: match (cleanup, yes) {
                    (true, _) => Some(true),
                    (false, true) => Some(false),
                    (false, false) => None,
                },
            };
            restore::handle_restore(&config, options)
        }
        Command::Cleanup { clone_name, yes } => {
            debug!(clone = %clone_name, "Handling cleanup command");
            cleanup::handle_cleanup(&config, &clone_name, yes)
        }
    }
}

/// Storage client for the configured controller. Prompts for the password
/// unless `HVR_STORAGE_PASSWORD` is set.
pub(crate) fn storage_client(config: &HvrConfig) -> Result<OntapClient> {
    config.validate_storage()?;
    let settings = &config.storage;
    let password = storage_password(&msg!(
        MESSAGES.restore.password_prompt,
        user = &settings.username,
        endpoint = &settings.endpoint
    ))?;
    let connection = StorageConnection::from_settings(settings, &password)?;
    if connection.accept_invalid_certs {
        hvr_warning!(
            "{}",
            msg!(MESSAGES.common.insecure_tls, endpoint = connection.endpoint.as_str())
        );
    }
    OntapClient::new(connection)
}
