//! Configuration for the capture and restore pipelines.

pub mod config;
pub mod loader;

pub use config::{BackupSettings, ExistingPolicy, HvrConfig, RestoreSettings, StorageSettings};
pub use loader::ConfigLoader;
