use crate::sink::{LogSink, SinkError};
use std::sync::Mutex;

/// Unwind payload raised by [`MemorySink::on_fatal`] in place of exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalTermination {
    pub line: String,
}

/// Keeps every written line in memory.
///
/// Intended for tests: the fatal hook unwinds with a [`FatalTermination`]
/// payload instead of ending the process, so fatal routing can be observed
/// with `std::panic::catch_unwind`.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Written lines parsed as JSON. Lines that are not valid JSON are skipped.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(line.to_string());
        Ok(())
    }

    fn on_fatal(&self, line: &str) -> ! {
        std::panic::panic_any(FatalTermination {
            line: line.to_string(),
        })
    }
}
