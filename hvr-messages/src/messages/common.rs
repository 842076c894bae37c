//! Shared messages

pub struct CommonMessages {
    pub config_defaults: &'static str,
    pub config_loaded: &'static str,
    pub error_generic: &'static str,
    pub insecure_tls: &'static str,
    pub logging_init_failed: &'static str,
}

pub const COMMON_MESSAGES: CommonMessages = CommonMessages {
    config_defaults: "No configuration file at {path}, using defaults",
    config_loaded: "Using configuration from {path}",
    error_generic: "Error: {error}",
    insecure_tls: "Certificate validation is disabled for {endpoint}. Do not use this against production storage.",
    logging_init_failed: "Failed to initialize logging ({error}), continuing without it",
};
