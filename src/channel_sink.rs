use crate::config::BufferConfig;
use crate::sink::{LogSink, SinkError};
use std::cell::RefCell;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// How long `flush` waits for the background task to drain, by default.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

thread_local! {
    /// Last line this thread could not enqueue.
    static REJECTED: RefCell<Option<String>> = const { RefCell::new(None) };
}

enum Command {
    Line(String),
    Flush(std_mpsc::SyncSender<()>),
}

/// Counters kept by a [`ChannelSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Lines offered to the sink.
    pub total: u64,
    /// Lines accepted into the channel.
    pub enqueued: u64,
    /// Lines dropped because the channel was full.
    pub dropped: u64,
}

/// Sink that hands lines to a background task over a bounded channel.
///
/// The task writes them to the inner sink in batches, either when a batch
/// fills up or when `flush_interval` elapses. Application threads never wait
/// on the inner sink's I/O, except through [`LogSink::flush`] and the
/// termination hooks.
///
/// `flush` blocks the calling thread until the task acknowledges; on a
/// current-thread runtime called from the runtime thread itself it gives up
/// after the flush timeout.
///
/// The termination hooks drain the channel first. If that fails, or the
/// terminating line was dropped on a full channel, the line is written to the
/// inner sink directly before the inner hook runs.
pub struct ChannelSink {
    sender: mpsc::Sender<Command>,
    inner: Arc<dyn LogSink>,
    flush_timeout: Duration,
    total_lines: Arc<AtomicU64>,
    enqueued_lines: Arc<AtomicU64>,
    dropped_lines: Arc<AtomicU64>,
}

impl ChannelSink {
    /// Create a new sink and spawn its background task on `runtime`.
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations.
    pub fn new(
        inner: Arc<dyn LogSink>,
        runtime: &Handle,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, rx) = mpsc::channel::<Command>(buffer);
        let handle = runtime.spawn(drain(Arc::clone(&inner), rx, batch_size, flush_interval));

        let sink = ChannelSink {
            sender: tx,
            inner,
            flush_timeout: FLUSH_TIMEOUT,
            total_lines: Arc::new(AtomicU64::new(0)),
            enqueued_lines: Arc::new(AtomicU64::new(0)),
            dropped_lines: Arc::new(AtomicU64::new(0)),
        };
        (sink, handle)
    }

    pub fn from_config(inner: Arc<dyn LogSink>, runtime: &Handle, config: &BufferConfig) -> (Self, JoinHandle<()>) {
        Self::new(
            inner,
            runtime,
            config.channel_buffer,
            config.batch_size,
            config.flush_interval(),
        )
    }

    /// Replace the default 5 s bound on how long `flush` waits.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            total: self.total_lines.load(Ordering::Relaxed),
            enqueued: self.enqueued_lines.load(Ordering::Relaxed),
            dropped: self.dropped_lines.load(Ordering::Relaxed),
        }
    }

    /// Make sure `line` reaches the inner sink before a termination hook.
    fn persist_terminal(&self, line: &str) {
        let rejected = REJECTED.with(|r| r.borrow_mut().take());
        let flushed = self.flush();
        if rejected.as_deref() != Some(line) && flushed.is_ok() {
            return;
        }
        if let Err(e) = self.inner.write_line(line) {
            tracing::warn!(target: "record_logger", error = %e, "terminating line lost");
        }
        let _ = self.inner.flush();
    }
}

async fn drain(
    inner: Arc<dyn LogSink>,
    mut rx: mpsc::Receiver<Command>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut batch = Vec::with_capacity(batch_size);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Line(line)) => {
                    batch.push(line);
                    if batch.len() >= batch_size {
                        write_batch(&*inner, &mut batch);
                    }
                }
                Some(Command::Flush(ack)) => {
                    write_batch(&*inner, &mut batch);
                    if let Err(e) = inner.flush() {
                        tracing::warn!(target: "record_logger", error = %e, "inner sink flush failed");
                    }
                    let _ = ack.send(());
                }
                None => {
                    write_batch(&*inner, &mut batch);
                    let _ = inner.flush();
                    break;
                }
            },
            _ = sleep(flush_interval) => {
                if !batch.is_empty() {
                    write_batch(&*inner, &mut batch);
                }
            }
        }
    }
}

fn write_batch(inner: &dyn LogSink, batch: &mut Vec<String>) {
    let mut failed = 0usize;
    let mut last_err = None;
    for line in batch.drain(..) {
        if let Err(e) = inner.write_line(&line) {
            failed += 1;
            last_err = Some(e);
        }
    }
    if let Some(e) = last_err {
        tracing::warn!(target: "record_logger", failed, error = %e, "log lines lost while draining channel");
    }
}

impl LogSink for ChannelSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        self.total_lines.fetch_add(1, Ordering::Relaxed);
        let err = match self.sender.try_send(Command::Line(line.to_string())) {
            Ok(()) => {
                self.enqueued_lines.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Full(_)) => {
                self.dropped_lines.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "record_logger", "log channel full, dropping line");
                SinkError::Full
            }
            Err(TrySendError::Closed(_)) => SinkError::Closed,
        };
        REJECTED.with(|r| *r.borrow_mut() = Some(line.to_string()));
        Err(err)
    }

    fn flush(&self) -> Result<(), SinkError> {
        let deadline = Instant::now() + self.flush_timeout;
        let (ack_tx, ack_rx) = std_mpsc::sync_channel(1);

        let mut command = Command::Flush(ack_tx);
        loop {
            match self.sender.try_send(command) {
                Ok(()) => break,
                Err(TrySendError::Closed(_)) => return Err(SinkError::Closed),
                Err(TrySendError::Full(back)) => {
                    if Instant::now() >= deadline {
                        return Err(SinkError::Full);
                    }
                    command = back;
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        ack_rx
            .recv_timeout(remaining)
            .map_err(|_| SinkError::Io(io::Error::new(io::ErrorKind::TimedOut, "log channel flush timed out")))
    }

    fn on_fatal(&self, line: &str) -> ! {
        self.persist_terminal(line);
        self.inner.on_fatal(line)
    }

    fn on_panic(&self, line: &str) -> ! {
        self.persist_terminal(line);
        self.inner.on_panic(line)
    }
}
