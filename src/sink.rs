use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Error returned by a [`LogSink`].
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("sink is closed")]
    Closed,

    #[error("sink buffer is full")]
    Full,
}

/// Destination for serialized log lines, plus the two termination hooks the
/// logger invokes after writing a `fatal` or `panic` event.
///
/// The logger shares one sink between every record derived from the root and
/// calls it from whatever thread is logging. Implementations must make each
/// `write_line` a single, complete write; ordering between threads is not
/// guaranteed.
pub trait LogSink: Send + Sync {
    /// Append one JSON line. `line` carries no trailing newline.
    fn write_line(&self, line: &str) -> Result<(), SinkError>;

    /// Flush buffered lines, if the sink buffers.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Called after a `fatal` event was written. Never returns.
    ///
    /// Default implementation flushes and exits the process with status 1.
    fn on_fatal(&self, _line: &str) -> ! {
        let _ = self.flush();
        std::process::exit(1)
    }

    /// Called after a `panic` event was written. Never returns.
    ///
    /// Default implementation flushes and panics with the line as payload, so
    /// an enclosing `catch_unwind` can intercept it.
    fn on_panic(&self, line: &str) -> ! {
        let _ = self.flush();
        panic!("{}", line)
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        (**self).write_line(line)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }

    fn on_fatal(&self, line: &str) -> ! {
        (**self).on_fatal(line)
    }

    fn on_panic(&self, line: &str) -> ! {
        (**self).on_panic(line)
    }
}

/// Sink over any [`Write`] implementation.
///
/// The writer sits behind a mutex and each line goes out as one `write_all`
/// of `line + "\n"`, so concurrent events never interleave.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        WriterSink::new(io::stdout())
    }
}

impl WriterSink<io::Stderr> {
    pub fn stderr() -> Self {
        WriterSink::new(io::stderr())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        // A panic while holding the lock leaves the writer usable; keep going.
        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&buf)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.flush()?;
        Ok(())
    }
}

/// Writes every line to each inner sink in order.
///
/// All sinks are attempted even if one fails; the first error is returned.
/// Termination hooks flush every sink, then defer to the first one.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        FanoutSink { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn each(&self, mut op: impl FnMut(&dyn LogSink) -> Result<(), SinkError>) -> Result<(), SinkError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = op(sink.as_ref()) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl LogSink for FanoutSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        self.each(|sink| sink.write_line(line))
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.each(|sink| sink.flush())
    }

    fn on_fatal(&self, line: &str) -> ! {
        let _ = self.flush();
        match self.sinks.first() {
            Some(sink) => sink.on_fatal(line),
            None => std::process::exit(1),
        }
    }

    fn on_panic(&self, line: &str) -> ! {
        let _ = self.flush();
        match self.sinks.first() {
            Some(sink) => sink.on_panic(line),
            None => panic!("{}", line),
        }
    }
}
