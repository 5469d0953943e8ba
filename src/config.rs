use crate::env::{
    env_or, LOG_DIR_ENV, LOG_FILE_EXT_ENV, LOG_FILE_NAME_ENV, LOG_MAX_FILES_ENV, LOG_ROTATION_ENV,
    LOG_STDOUT_ENV, LOG_TIME_FORMAT_ENV,
};
use crate::format::TimeFormat;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Error type returned when a configuration value cannot be interpreted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown rotation {0:?}, expected minutely, hourly, daily or never")]
    UnknownRotation(String),

    #[error("unknown time format {0:?}, expected unix_nanos, subsecond or rfc3339")]
    UnknownTimeFormat(String),

    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("{key} must be true or false, got {value:?}")]
    InvalidBool { key: String, value: String },
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationKind {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl FromStr for RotationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minutely" => Ok(RotationKind::Minutely),
            "hourly" => Ok(RotationKind::Hourly),
            "daily" => Ok(RotationKind::Daily),
            "never" => Ok(RotationKind::Never),
            _ => Err(ConfigError::UnknownRotation(s.to_string())),
        }
    }
}

/// Location and retention of the rotating log file.
///
/// The file is written to `<save_path>/<file_name>.<date>.<ext>`; rotation
/// and retention are handled by the appender, not by the logger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub save_path: PathBuf,
    pub file_name: String,
    pub file_ext: String,
    pub rotation: RotationKind,
    /// Number of rotated files kept before the oldest is removed.
    pub max_log_files: usize,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("storage/logs"),
            file_name: "app".to_string(),
            file_ext: ".log".to_string(),
            rotation: RotationKind::Daily,
            max_log_files: 10,
        }
    }
}

impl FileSinkConfig {
    /// Extension without its leading dot, as used for the file suffix.
    pub fn suffix(&self) -> &str {
        self.file_ext.trim_start_matches('.')
    }
}

/// Settings for the background channel sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval_ms: 1000,
        }
    }
}

impl BufferConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Everything the application passes to [`build_logger`](crate::init::build_logger).
///
/// **Fields**
/// - `file`: rotating file output; `None` disables it.
/// - `enable_stdout`: additionally write every line to stdout.
/// - `time_format`: rendering of the `time` key.
/// - `capture_callers`: attach the full caller trace of the construction
///   site to the root logger.
/// - `buffered`: hand lines to a background task instead of writing inline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub file: Option<FileSinkConfig>,
    pub enable_stdout: bool,
    pub time_format: TimeFormat,
    pub capture_callers: bool,
    pub buffered: Option<BufferConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file: Some(FileSinkConfig::default()),
            enable_stdout: false,
            time_format: TimeFormat::default(),
            capture_callers: true,
            buffered: None,
        }
    }
}

fn parse_number(key: &str, value: String) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value,
    })
}

fn parse_bool(key: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value,
        }),
    }
}

impl LoggerConfig {
    /// Build a config from `RECORD_LOGGER_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = FileSinkConfig::default();
        let file = FileSinkConfig {
            save_path: PathBuf::from(env_or(LOG_DIR_ENV, &defaults.save_path.to_string_lossy())),
            file_name: env_or(LOG_FILE_NAME_ENV, &defaults.file_name),
            file_ext: env_or(LOG_FILE_EXT_ENV, &defaults.file_ext),
            rotation: env_or(LOG_ROTATION_ENV, "daily").parse()?,
            max_log_files: parse_number(
                LOG_MAX_FILES_ENV,
                env_or(LOG_MAX_FILES_ENV, &defaults.max_log_files.to_string()),
            )?,
        };

        Ok(LoggerConfig {
            file: Some(file),
            enable_stdout: parse_bool(LOG_STDOUT_ENV, env_or(LOG_STDOUT_ENV, "false"))?,
            time_format: env_or(LOG_TIME_FORMAT_ENV, "unix_nanos").parse()?,
            ..LoggerConfig::default()
        })
    }
}
