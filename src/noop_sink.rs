use crate::sink::{LogSink, SinkError};

/// A sink that simply drops all lines.
///
/// Useful for measuring the cost of formatting without any I/O. The
/// termination hooks keep their default behavior.
#[derive(Clone, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write_line(&self, _line: &str) -> Result<(), SinkError> {
        Ok(())
    }
}
