//! Client for the weather-station sensor API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;

use crate::{Error, Result};

/// The sensor types a formatted reading needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    AbsolutePressure,
    SeaLevelPressure,
}

impl SensorKind {
    /// Wire name used by the sensor API.
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::AbsolutePressure => "absolutepressure",
            SensorKind::SeaLevelPressure => "seaLevelPressure",
        }
    }
}

/// A single typed sensor value within a reading.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

/// One device or location reading.
#[derive(Debug, Clone, Deserialize)]
pub struct Reading {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sensors: Vec<SensorValue>,
}

impl Reading {
    /// Value of an expected sensor type; absence is a malformed reading.
    pub fn sensor(&self, kind: SensorKind) -> Result<f64> {
        self.sensors
            .iter()
            .find(|sensor| sensor.kind == kind.as_str())
            .map(|sensor| sensor.value)
            .ok_or_else(|| Error::MalformedReading {
                device: self.name.clone(),
                sensor: kind.as_str(),
            })
    }
}

/// A device or location the `/current` command reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorTarget {
    Device(String),
    Location(String),
}

impl FromStr for SensorTarget {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.split_once(':') {
            Some(("device", id)) if !id.is_empty() => Ok(SensorTarget::Device(id.to_string())),
            Some(("location", name)) if !name.is_empty() => {
                Ok(SensorTarget::Location(name.to_string()))
            }
            _ => Err(Error::Config(format!(
                "Invalid sensor target '{}', expected device:<id> or location:<name>",
                raw
            ))),
        }
    }
}

/// The API returns a bare object for device reads and an array for locations.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Reading>),
    One(Reading),
}

impl From<OneOrMany> for Vec<Reading> {
    fn from(body: OneOrMany) -> Self {
        match body {
            OneOrMany::Many(readings) => readings,
            OneOrMany::One(reading) => vec![reading],
        }
    }
}

/// Thin HTTP client for current sensor readings.
pub struct SensorClient {
    http: reqwest::Client,
    base_url: String,
}

impl SensorClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Current readings for a device id.
    pub async fn current(&self, device_id: &str) -> Result<Vec<Reading>> {
        self.fetch(format!("{}/data/{}/current", self.base_url, device_id))
            .await
    }

    /// Latest readings for a location name.
    pub async fn latest(&self, location: &str) -> Result<Vec<Reading>> {
        self.fetch(format!("{}/locations/{}/latest", self.base_url, location))
            .await
    }

    async fn fetch(&self, url: String) -> Result<Vec<Reading>> {
        let body: OneOrMany = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_BODY: &str = r#"{
        "name": "Backyard",
        "timestamp": "2024-03-01T10:30:00Z",
        "sensors": [
            {"type": "temperature", "value": 21.234},
            {"type": "absolutepressure", "value": 1012.3},
            {"type": "seaLevelPressure", "value": 1015.6}
        ]
    }"#;

    #[test]
    fn decodes_a_bare_reading_object() {
        let body: OneOrMany = serde_json::from_str(DEVICE_BODY).unwrap();
        let readings = Vec::from(body);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].name, "Backyard");
    }

    #[test]
    fn decodes_a_reading_array() {
        let body: OneOrMany = serde_json::from_str(&format!("[{}]", DEVICE_BODY)).unwrap();
        let readings = Vec::from(body);
        assert_eq!(readings.len(), 1);
    }

    #[test]
    fn extracts_expected_sensor_values() {
        let reading: Reading = serde_json::from_str(DEVICE_BODY).unwrap();
        assert_eq!(reading.sensor(SensorKind::Temperature).unwrap(), 21.234);
        assert_eq!(
            reading.sensor(SensorKind::SeaLevelPressure).unwrap(),
            1015.6
        );
    }

    #[test]
    fn missing_sensor_type_is_a_malformed_reading() {
        let reading: Reading = serde_json::from_str(
            r#"{"name": "Backyard", "timestamp": "2024-03-01T10:30:00Z", "sensors": []}"#,
        )
        .unwrap();

        let err = reading.sensor(SensorKind::Temperature).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedReading {
                sensor: "temperature",
                ..
            }
        ));
    }

    #[test]
    fn parses_sensor_targets() {
        assert_eq!(
            "device:abc123".parse::<SensorTarget>().unwrap(),
            SensorTarget::Device("abc123".to_string())
        );
        assert_eq!(
            "location:backyard".parse::<SensorTarget>().unwrap(),
            SensorTarget::Location("backyard".to_string())
        );
        assert!("backyard".parse::<SensorTarget>().is_err());
    }

    #[tokio::test]
    async fn fetches_device_readings() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data/abc123/current")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DEVICE_BODY)
            .create_async()
            .await;

        let client = SensorClient::new(reqwest::Client::new(), server.url());
        let readings = client.current("abc123").await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].name, "Backyard");
    }

    #[tokio::test]
    async fn server_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/locations/backyard/latest")
            .with_status(502)
            .create_async()
            .await;

        let client = SensorClient::new(reqwest::Client::new(), server.url());
        assert!(client.latest("backyard").await.is_err());
    }
}
