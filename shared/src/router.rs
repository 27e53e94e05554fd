//! Command routing and reply formatting.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::Activity;
use crate::sensors::{Reading, SensorClient, SensorKind, SensorTarget};
use crate::Result;

/// Separator between formatted reading blocks.
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Reply to the `/sensors` command (U+1F610, neutral face).
const NEUTRAL_FACE: &str = "\u{1F610}";

/// Channel whose messages may arrive as inline queries.
const INLINE_QUERY_CHANNEL: &str = "telegram";

/// Decides which reply an inbound activity gets.
pub struct Router {
    sensors: SensorClient,
    targets: Vec<SensorTarget>,
    default_reply: Option<String>,
}

impl Router {
    pub fn new(
        sensors: SensorClient,
        targets: Vec<SensorTarget>,
        default_reply: Option<String>,
    ) -> Self {
        Self {
            sensors,
            targets,
            default_reply,
        }
    }

    /// Produce the reply text for an activity, `None` to stay silent.
    ///
    /// `now` anchors the calendar-style timestamps in `/current` replies.
    pub async fn route(&self, activity: &Activity, now: DateTime<Utc>) -> Result<Option<String>> {
        let Some(text) = effective_text(activity) else {
            return Ok(self.default_reply.clone());
        };

        if text.starts_with("/current") {
            return Ok(Some(self.current_report(now).await?));
        }

        if text.starts_with("/sensors") {
            return Ok(Some(NEUTRAL_FACE.to_string()));
        }

        debug!(%text, "no command matched");
        Ok(self.default_reply.clone())
    }

    /// Fetch every configured target and join the formatted readings.
    async fn current_report(&self, now: DateTime<Utc>) -> Result<String> {
        let mut blocks = Vec::new();

        for target in &self.targets {
            let readings = match target {
                SensorTarget::Device(id) => self.sensors.current(id).await?,
                SensorTarget::Location(name) => self.sensors.latest(name).await?,
            };

            for reading in &readings {
                blocks.push(format_reading(reading, now)?);
            }
        }

        Ok(blocks.join(BLOCK_SEPARATOR))
    }
}

/// The text a routing decision is based on.
///
/// Plain text wins; Telegram inline queries are normalised by mapping `-`
/// to `/` since inline queries cannot start with a slash.
fn effective_text(activity: &Activity) -> Option<String> {
    if let Some(text) = &activity.text {
        return Some(text.clone());
    }

    if activity.channel_id.as_deref() == Some(INLINE_QUERY_CHANNEL) {
        if let Some(query) = activity
            .channel_data
            .as_ref()
            .and_then(|data| data.inline_query.as_ref())
        {
            return Some(query.query.replace('-', "/"));
        }
    }

    None
}

fn format_reading(reading: &Reading, now: DateTime<Utc>) -> Result<String> {
    let temperature = reading.sensor(SensorKind::Temperature)?;
    let absolute_pressure = reading.sensor(SensorKind::AbsolutePressure)?;
    let sea_level_pressure = reading.sensor(SensorKind::SeaLevelPressure)?;

    Ok(format!(
        "**{} {}**\n\nTemp: {}°C\n\nAbs. pressure: {} hPa\n\nSea level pressure: {} hPa",
        reading.name,
        calendar_time(reading.timestamp, now),
        round2(temperature),
        round2(absolute_pressure),
        round2(sea_level_pressure),
    ))
}

/// Round to two decimal places, ties away from zero on the scaled value.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calendar-style rendering of a timestamp relative to `now`.
fn calendar_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days_ago = now
        .date_naive()
        .signed_duration_since(timestamp.date_naive())
        .num_days();

    match days_ago {
        0 => format!("Today at {}", timestamp.format("%H:%M")),
        1 => format!("Yesterday at {}", timestamp.format("%H:%M")),
        2..=6 => timestamp.format("%A at %H:%M").to_string(),
        _ => timestamp.format("%Y-%m-%d %H:%M").to_string(),
    }
}
