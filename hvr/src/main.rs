// Standard library
use std::sync::OnceLock;
use uuid::Uuid;

// External crates
use clap::Parser;
use tracing::{debug, info_span};

// Internal imports
use hvr_core::{hvr_error, hvr_warning};
use hvr_logging::LogSettings;
use hvr_messages::{msg, MESSAGES};

// Local modules
mod cli;
mod commands;
mod prompt;

use cli::Args;
use commands::execute_command;

/// Request ID for this execution, attached to every log line
static REQUEST_ID: OnceLock<String> = OnceLock::new();

fn get_request_id() -> &'static str {
    REQUEST_ID.get_or_init(|| Uuid::new_v4().to_string())
}

fn main() {
    let args = Args::parse();

    let mut log_settings = LogSettings::from_env();
    if args.debug {
        log_settings.level = "debug".to_string();
    }
    // Flushes the log file on drop
    let _log_guard = match hvr_logging::init_with(&log_settings) {
        Ok(guard) => guard,
        Err(e) => {
            hvr_warning!("{}", msg!(MESSAGES.common.logging_init_failed, error = e));
            None
        }
    };

    let span = info_span!("hvr", request_id = get_request_id(), command = args.command.name());
    let _entered = span.enter();
    debug!(?args, "starting");

    if let Err(e) = execute_command(args) {
        hvr_error!("{}", msg!(MESSAGES.common.error_generic, error = &e));
        std::process::exit(1);
    }
}
