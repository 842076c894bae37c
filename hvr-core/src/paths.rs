//! Per-user locations for configuration and logs.

use crate::error::{HvrError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "hvrestore";

/// `<config dir>/hvrestore`, e.g. `%APPDATA%\hvrestore` or `~/.config/hvrestore`
pub fn user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| HvrError::Config("Could not determine the user configuration directory".into()))
}

/// `<data dir>/hvrestore`, used for the default log file location
pub fn user_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| HvrError::Config("Could not determine the user data directory".into()))
}

pub fn default_config_file() -> Result<PathBuf> {
    Ok(user_config_dir()?.join("config.yaml"))
}

pub fn default_log_file() -> Result<PathBuf> {
    Ok(user_data_dir()?.join("hvr.log"))
}
