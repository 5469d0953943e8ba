use crate::fields::Fields;
use crate::level::Level;
use crate::logger::Logger;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Target of the crate's own diagnostics; never bridged.
const INTERNAL_TARGET: &str = "record_logger";

/// `tracing_subscriber` layer that re-emits every `tracing` event through a
/// [`Logger`].
///
/// Event fields become logger fields, the `message` field becomes the
/// message, and the caller trace is the event's source location. `TRACE`
/// events are written at `debug`; nothing bridged is ever `fatal` or `panic`.
pub struct LoggerLayer {
    logger: Logger,
    /// Events written through the logger.
    pub bridged_events: Arc<AtomicU64>,
}

impl LoggerLayer {
    pub fn new(logger: Logger) -> Self {
        LoggerLayer {
            logger,
            bridged_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

fn location(event: &Event<'_>) -> Vec<String> {
    let meta = event.metadata();
    match (meta.file(), meta.line()) {
        (Some(file), Some(line)) => {
            let function = meta.module_path().unwrap_or_else(|| meta.target());
            vec![format!("{}: {} {}", file, line, function)]
        }
        _ => Vec::new(),
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target() == INTERNAL_TARGET {
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        self.logger
            .with_fields(fields)
            .with_callers(location(event))
            .with_level(Level::from(*meta.level()))
            .output(message.as_deref().unwrap_or_default());
        self.bridged_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Collects `tracing` field values as JSON.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
