use crate::channel_sink::ChannelSink;
use crate::config::{ConfigError, LoggerConfig};
use crate::layer::LoggerLayer;
use crate::logger::Logger;
use crate::sink::{FanoutSink, LogSink, WriterSink};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Error type returned while building the root logger.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid logger configuration: {0}")]
    Config(#[from] ConfigError),

    #[cfg(feature = "rolling-file")]
    #[error(transparent)]
    Rolling(#[from] crate::file_sink::RollingInitError),

    #[error("file output requires the `rolling-file` feature")]
    RollingFeatureDisabled,

    #[error("no output configured: enable the file sink or stdout")]
    NoOutput,

    #[error("buffered output needs a running tokio runtime")]
    NoRuntime,

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}

fn file_sink(config: &LoggerConfig) -> Result<Option<Arc<dyn LogSink>>, InitError> {
    let Some(file) = &config.file else {
        return Ok(None);
    };

    #[cfg(feature = "rolling-file")]
    {
        let sink = crate::file_sink::RollingFileSink::new(file)?;
        Ok(Some(Arc::new(sink) as Arc<dyn LogSink>))
    }

    #[cfg(not(feature = "rolling-file"))]
    {
        let _ = file;
        Err(InitError::RollingFeatureDisabled)
    }
}

/// Build the sink stack described by `config`: rotating file and/or stdout,
/// optionally behind a [`ChannelSink`].
pub fn build_sink(config: &LoggerConfig) -> Result<Arc<dyn LogSink>, InitError> {
    let mut sinks = Vec::new();
    if let Some(file) = file_sink(config)? {
        sinks.push(file);
    }
    if config.enable_stdout {
        sinks.push(Arc::new(WriterSink::stdout()) as Arc<dyn LogSink>);
    }

    let sink = match sinks.len() {
        0 => return Err(InitError::NoOutput),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutSink::new(sinks)) as Arc<dyn LogSink>,
    };

    match &config.buffered {
        Some(buffer) => {
            let runtime = tokio::runtime::Handle::try_current().map_err(|_| InitError::NoRuntime)?;
            // The drain task runs until the sink is dropped.
            let (channel, _handle) = ChannelSink::from_config(sink, &runtime, buffer);
            Ok(Arc::new(channel))
        }
        None => Ok(sink),
    }
}

/// Build the process's root logger from `config`.
///
/// **Returns**
/// - A [`Logger`] bound to the configured sinks, using the configured time
///   format and, if `capture_callers` is set, carrying the full caller trace
///   of this call site.
/// - `Err(..)` if a sink cannot be created.
///
/// The logger is meant to be built once and passed around; it is cheap to
/// clone and every call site derives its own copy.
pub fn build_logger(config: &LoggerConfig) -> Result<Logger, InitError> {
    let sink = build_sink(config)?;
    let logger = Logger::new(sink).with_time_format(config.time_format);
    if config.capture_callers {
        Ok(logger.with_callers_frame())
    } else {
        Ok(logger)
    }
}

/// Install [`LoggerLayer`] as the global `tracing` subscriber, so events from
/// `tracing` macros anywhere in the process are written through `logger`.
pub fn init_tracing_bridge(logger: Logger) -> Result<(), InitError> {
    let subscriber = Registry::default().with(LoggerLayer::new(logger));
    tracing::subscriber::set_global_default(subscriber).map_err(|_| InitError::SubscriberAlreadySet)
}

/// Same as [`init_tracing_bridge`], with a `fmt` layer added so events are
/// also printed to the console in human-readable form.
pub fn init_tracing_bridge_with_stdout(logger: Logger) -> Result<(), InitError> {
    let fmt_layer = tracing_subscriber::fmt::layer();
    let subscriber = Registry::default().with(LoggerLayer::new(logger)).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(|_| InitError::SubscriberAlreadySet)
}
