//! Error types for prefixgate.

use thiserror::Error;

/// Result type alias using prefixgate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for prefixgate.
///
/// Request-time path resolution never fails; these variants cover startup
/// (configuration, telemetry) and serving.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Startup Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // =========================================================================
    // Serving Errors
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a telemetry error.
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }
}
