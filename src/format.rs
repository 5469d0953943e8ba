use crate::config::ConfigError;
use crate::fields::FieldSet;
use crate::level::Level;
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

pub const LEVEL_KEY: &str = "level";
pub const TIME_KEY: &str = "time";
pub const MESSAGE_KEY: &str = "message";
pub const CALLERS_KEY: &str = "callers";

/// Keys written by the formatter. User fields with these names are ignored.
pub const RESERVED_KEYS: [&str; 4] = [LEVEL_KEY, TIME_KEY, MESSAGE_KEY, CALLERS_KEY];

/// Marker written to the `error` key when an event had to be degraded.
pub const SERIALIZATION_FAILED: &str = "serialization failed";

/// How the `time` key is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// Nanoseconds since the Unix epoch, as an integer.
    #[default]
    UnixNanos,
    /// Only the nanosecond-of-second component of local time (0..=999_999_999,
    /// rolls over every second).
    Subsecond,
    /// Local time as RFC 3339 text with nanosecond precision.
    Rfc3339,
}

impl FromStr for TimeFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unix_nanos" => Ok(TimeFormat::UnixNanos),
            "subsecond" => Ok(TimeFormat::Subsecond),
            "rfc3339" => Ok(TimeFormat::Rfc3339),
            _ => Err(ConfigError::UnknownTimeFormat(s.to_string())),
        }
    }
}

/// Failure while turning a record into a JSON line.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("field {key:?} could not be serialized: {reason}")]
    Field { key: String, reason: String },

    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Builds the JSON event for a record and a rendered message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Formatter {
    time_format: TimeFormat,
}

impl Formatter {
    pub fn new(time_format: TimeFormat) -> Self {
        Formatter { time_format }
    }

    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub fn timestamp(&self) -> Value {
        let now = Local::now();
        match self.time_format {
            TimeFormat::UnixNanos => Value::from(unix_nanos(&now)),
            TimeFormat::Subsecond => Value::from(now.nanosecond()),
            TimeFormat::Rfc3339 => Value::from(now.to_rfc3339_opts(SecondsFormat::Nanos, false)),
        }
    }

    fn reserved(&self, level: Level, message: &str, callers: &[String]) -> Map<String, Value> {
        let mut event = Map::new();
        event.insert(LEVEL_KEY.to_string(), Value::from(level.as_str()));
        event.insert(TIME_KEY.to_string(), self.timestamp());
        event.insert(MESSAGE_KEY.to_string(), Value::from(message));
        event.insert(
            CALLERS_KEY.to_string(),
            Value::Array(callers.iter().cloned().map(Value::String).collect()),
        );
        event
    }

    /// Event object: the reserved keys first, then every user field whose key
    /// is not already taken.
    pub fn format(
        &self,
        level: Level,
        message: &str,
        callers: &[String],
        fields: &FieldSet,
    ) -> Result<Map<String, Value>, FormatError> {
        if let Some((key, reason)) = fields.first_invalid() {
            return Err(FormatError::Field {
                key: key.to_string(),
                reason: reason.to_string(),
            });
        }

        let mut event = self.reserved(level, message, callers);
        for (key, value) in fields.iter() {
            event.entry(key.to_string()).or_insert_with(|| value.clone());
        }
        Ok(event)
    }

    /// One JSON line (without trailing newline).
    pub fn encode(
        &self,
        level: Level,
        message: &str,
        callers: &[String],
        fields: &FieldSet,
    ) -> Result<String, FormatError> {
        let event = self.format(level, message, callers, fields)?;
        Ok(serde_json::to_string(&event)?)
    }

    /// Fallback line used when [`Formatter::encode`] fails. User fields are
    /// dropped and the failure is recorded under `error` / `error_detail`.
    pub fn degraded(&self, level: Level, message: &str, callers: &[String], err: &FormatError) -> String {
        let mut event = self.reserved(level, message, callers);
        event.insert("error".to_string(), Value::from(SERIALIZATION_FAILED));
        event.insert("error_detail".to_string(), Value::from(err.to_string()));
        Value::Object(event).to_string()
    }
}

/// Nanoseconds since the epoch, saturating outside the years 1677..=2262.
fn unix_nanos<Tz: TimeZone>(at: &DateTime<Tz>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(if at.timestamp() < 0 { i64::MIN } else { i64::MAX })
}
