use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Error type shared by every hvrestore crate.
///
/// Variants follow the operator-facing taxonomy: input mistakes, remote call
/// failures (reported verbatim), per-item collaborator failures and local
/// filesystem/serialization problems.
#[derive(Error, Debug)]
pub enum HvrError {
    /// Operator input did not match anything (record, volume, snapshot, entity)
    Input(String),
    /// A lookup returned no result
    NotFound(String),
    /// A storage REST call failed. `status` is `None` when no response arrived.
    Remote {
        operation: String,
        status: Option<u16>,
        body: String,
    },
    Hypervisor(String),
    /// Cloned data did not look like the selected machine
    Validation(String),
    Conflict(String),
    Config(String),
    Filesystem(String),
    Serialization(String),
    Internal(String),
    Io(#[from] std::io::Error),
    Other(#[from] anyhow::Error),
}

impl Display for HvrError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            HvrError::Input(s) => write!(f, "Invalid input: {}", s),
            HvrError::NotFound(s) => write!(f, "Not found: {}", s),
            HvrError::Remote {
                operation,
                status: Some(code),
                body,
            } => write!(f, "{} failed with HTTP {}: {}", operation, code, body),
            HvrError::Remote {
                operation,
                status: None,
                body,
            } => write!(f, "{} failed before a response was received: {}", operation, body),
            HvrError::Hypervisor(s) => write!(f, "Hypervisor error: {}", s),
            HvrError::Validation(s) => write!(f, "Clone validation failed: {}", s),
            HvrError::Conflict(s) => write!(f, "Conflict: {}", s),
            HvrError::Config(s) => write!(f, "Configuration error: {}", s),
            HvrError::Filesystem(s) => write!(f, "Filesystem error: {}", s),
            HvrError::Serialization(s) => write!(f, "Serialization error: {}", s),
            HvrError::Internal(s) => write!(f, "Internal error: {}", s),
            HvrError::Io(e) => write!(f, "I/O error: {}", e),
            HvrError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl HvrError {
    /// Wrap a filesystem failure with the path and operation that caused it
    pub fn filesystem(
        source: impl Display,
        path: impl AsRef<str>,
        operation: impl AsRef<str>,
    ) -> Self {
        HvrError::Filesystem(format!(
            "'{}' on '{}': {}",
            operation.as_ref(),
            path.as_ref(),
            source
        ))
    }

    /// Build a remote-call error carrying the upstream status and body verbatim
    pub fn remote(operation: impl Into<String>, status: Option<u16>, body: impl Into<String>) -> Self {
        HvrError::Remote {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        HvrError::Input(message.into())
    }

    /// HTTP status of a remote failure, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            HvrError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HvrError::NotFound(_)) || self.status() == Some(404)
    }
}

impl From<serde_yaml_ng::Error> for HvrError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        HvrError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for HvrError {
    fn from(err: serde_json::Error) -> Self {
        HvrError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HvrError>;
