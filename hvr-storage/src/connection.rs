use hvr_config::StorageSettings;
use hvr_core::error::{HvrError, Result};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Everything a client needs to reach the controller.
///
/// Certificate validation is relaxed only for clients built from a
/// connection that asks for it; nothing is switched process-wide.
#[derive(Clone)]
pub struct StorageConnection {
    pub endpoint: Url,
    pub username: String,
    pub password: String,
    pub svm: Option<String>,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl StorageConnection {
    pub fn new(endpoint: &str, username: &str, password: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| HvrError::Config(format!("invalid storage endpoint '{}': {}", endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(HvrError::Config(format!(
                "storage endpoint '{}' must be an http(s) URL",
                endpoint
            )));
        }
        Ok(Self {
            endpoint,
            username: username.to_string(),
            password: password.to_string(),
            svm: None,
            accept_invalid_certs: false,
            timeout: Duration::from_secs(60),
        })
    }

    /// Build from the `storage` config section plus a runtime password
    pub fn from_settings(settings: &StorageSettings, password: &str) -> Result<Self> {
        let mut connection = Self::new(&settings.endpoint, &settings.username, password)?;
        connection.svm = settings.svm.clone();
        connection.accept_invalid_certs = settings.accept_invalid_certs;
        connection.timeout = Duration::from_secs(settings.timeout_secs);
        Ok(connection)
    }
}

impl fmt::Debug for StorageConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConnection")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("svm", &self.svm)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish()
    }
}
