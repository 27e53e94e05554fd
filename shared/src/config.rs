//! Configuration management for Lambda functions.

use std::env;

use crate::sensors::SensorTarget;
use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Encrypted bot client id (base64 KMS ciphertext)
    pub client_id_cipher: String,
    /// Encrypted bot client secret (base64 KMS ciphertext)
    pub client_secret_cipher: String,
    /// Sensor API base URL
    pub sensors_api: String,
    /// DynamoDB table holding the cached bearer token; unset disables caching
    pub token_table: Option<String>,
    /// Devices and locations queried by the `/current` command
    pub sensor_targets: Vec<SensorTarget>,
    /// Reply sent when no command matches; unset suppresses the reply
    pub default_reply: Option<String>,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id_cipher: require("MS_BOT_CLIENT_ID")?,
            client_secret_cipher: require("MS_BOT_CLIENT_SECRET")?,
            sensors_api: require("SENSORS_API")?,
            token_table: env::var("TOKEN_TABLE_NAME").ok().filter(|t| !t.is_empty()),
            sensor_targets: parse_targets(&require("SENSOR_TARGETS")?)?,
            default_reply: env::var("DEFAULT_REPLY").ok().filter(|r| !r.is_empty()),
            aws_region: env::var("AWS_REGION")
                .or_else(|_| env::var("SERVERLESS_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} not set", name)))
}

/// Parse a comma-separated list of `device:<id>` / `location:<name>` entries.
fn parse_targets(raw: &str) -> Result<Vec<SensorTarget>> {
    let targets = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<SensorTarget>>>()?;

    if targets.is_empty() {
        return Err(Error::Config("SENSOR_TARGETS is empty".to_string()));
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_target_list() {
        let targets = parse_targets("device:b764034949e0c864, location:backyard").unwrap();
        assert_eq!(
            targets,
            vec![
                SensorTarget::Device("b764034949e0c864".to_string()),
                SensorTarget::Location("backyard".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_empty_target_list() {
        assert!(parse_targets(" , ").is_err());
    }

    #[test]
    fn rejects_unknown_target_kind() {
        assert!(parse_targets("station:roof").is_err());
    }
}
