use crate::config::{FileSinkConfig, RotationKind};
use crate::sink::{LogSink, SinkError};
use std::io::Write;
use std::sync::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

impl From<RotationKind> for Rotation {
    fn from(kind: RotationKind) -> Self {
        match kind {
            RotationKind::Minutely => Rotation::MINUTELY,
            RotationKind::Hourly => Rotation::HOURLY,
            RotationKind::Daily => Rotation::DAILY,
            RotationKind::Never => Rotation::NEVER,
        }
    }
}

/// Error type returned when the rolling appender cannot be created.
#[derive(thiserror::Error, Debug)]
#[error("cannot open rolling log file in {dir}: {reason}")]
pub struct RollingInitError {
    pub dir: String,
    pub reason: String,
}

/// Sink writing JSON lines to a rotating file.
///
/// File naming, rotation and pruning of old files are delegated to
/// `tracing_appender`'s [`RollingFileAppender`].
pub struct RollingFileSink {
    appender: Mutex<RollingFileAppender>,
}

impl RollingFileSink {
    /// Create the appender described by `config`, creating the directory if
    /// it does not exist yet.
    pub fn new(config: &FileSinkConfig) -> Result<Self, RollingInitError> {
        let init_err = |reason: String| RollingInitError {
            dir: config.save_path.display().to_string(),
            reason,
        };

        std::fs::create_dir_all(&config.save_path).map_err(|e| init_err(e.to_string()))?;

        let mut builder = RollingFileAppender::builder()
            .rotation(config.rotation.into())
            .filename_prefix(config.file_name.clone())
            .max_log_files(config.max_log_files.max(1));
        if !config.suffix().is_empty() {
            builder = builder.filename_suffix(config.suffix().to_string());
        }

        let appender = builder
            .build(&config.save_path)
            .map_err(|e| init_err(e.to_string()))?;

        Ok(RollingFileSink {
            appender: Mutex::new(appender),
        })
    }
}

impl LogSink for RollingFileSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut appender = self.appender.lock().unwrap_or_else(|p| p.into_inner());
        appender.write_all(&buf)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut appender = self.appender.lock().unwrap_or_else(|p| p.into_inner());
        appender.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_lines_under_configured_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileSinkConfig {
            save_path: dir.path().join("logs"),
            file_name: "blog".to_string(),
            file_ext: ".log".to_string(),
            rotation: RotationKind::Never,
            max_log_files: 3,
        };

        let sink = RollingFileSink::new(&config).unwrap();
        sink.write_line(r#"{"level":"info"}"#).unwrap();
        sink.write_line(r#"{"level":"warn"}"#).unwrap();
        sink.flush().unwrap();

        let entries: Vec<_> = std::fs::read_dir(&config.save_path)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("blog"));
        assert!(name.ends_with("log"));

        let content = std::fs::read_to_string(&entries[0]).unwrap();
        assert_eq!(content, "{\"level\":\"info\"}\n{\"level\":\"warn\"}\n");
    }
}
