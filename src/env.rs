//! Environment variable names read by
//! [`LoggerConfig::from_env`](crate::config::LoggerConfig::from_env).
//!
//! These are purely helpers; the sinks and the logger never touch the
//! environment themselves.

/// Directory the rotating log file is written to.
pub const LOG_DIR_ENV: &str = "RECORD_LOGGER_DIR";

/// Base file name, without date or extension.
pub const LOG_FILE_NAME_ENV: &str = "RECORD_LOGGER_FILE_NAME";

/// File extension, e.g. `.log`.
pub const LOG_FILE_EXT_ENV: &str = "RECORD_LOGGER_FILE_EXT";

/// `minutely`, `hourly`, `daily` or `never`.
pub const LOG_ROTATION_ENV: &str = "RECORD_LOGGER_ROTATION";

/// Number of rotated files kept.
pub const LOG_MAX_FILES_ENV: &str = "RECORD_LOGGER_MAX_FILES";

/// `unix_nanos`, `subsecond` or `rfc3339`.
pub const LOG_TIME_FORMAT_ENV: &str = "RECORD_LOGGER_TIME_FORMAT";

/// Also write lines to stdout when truthy.
pub const LOG_STDOUT_ENV: &str = "RECORD_LOGGER_STDOUT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
