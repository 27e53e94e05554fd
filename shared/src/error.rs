//! Error types for the sensor-bot Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the sensor-bot Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Malformed inbound transport event
    #[error("Invalid inbound event: {0}")]
    InvalidEvent(String),

    /// Outbound HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A sensor reading that lacks an expected sensor type
    #[error("Reading from '{device}' is missing the '{sensor}' sensor")]
    MalformedReading {
        device: String,
        sensor: &'static str,
    },
}
