use crate::fields::{FieldSet, Fields};
use crate::format::{FormatError, Formatter, TimeFormat};
use crate::level::Level;
use crate::sink::{LogSink, SinkError};
use crate::stack::{BacktraceStack, StackProvider, MAX_CALLER_DEPTH};
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque value carried along with a record and never inspected.
pub type Context = Arc<dyn Any + Send + Sync>;

/// Structured logger record.
///
/// A `Logger` is a value: every `with_*` call returns a new record and leaves
/// the receiver untouched. The sink, stack provider and context are shared
/// handles; the field set and caller trace are owned by each record.
///
/// The usual pattern is one root logger built at startup and passed to
/// whoever needs it, with a specialized copy derived at each call site:
///
/// ```no_run
/// use record_logger::{fields, Logger, WriterSink};
/// use std::sync::Arc;
///
/// let root = Logger::new(Arc::new(WriterSink::stdout())).with_callers_frame();
/// root.with_fields(fields! { "order_id" => 42 }).warnf(format_args!("retry {} of {}", 1, 3));
/// ```
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    stack: Arc<dyn StackProvider>,
    formatter: Formatter,
    context: Option<Context>,
    level: Level,
    fields: FieldSet,
    callers: Vec<String>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .field("callers", &self.callers)
            .field("has_context", &self.context.is_some())
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

macro_rules! emitters {
    ($($(#[$doc:meta])* $level:ident => $plain:ident, $formatted:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $plain(&self, message: impl fmt::Display) {
                self.with_level(Level::$level).output(&message.to_string());
            }

            $(#[$doc])*
            pub fn $formatted(&self, args: fmt::Arguments<'_>) {
                self.with_level(Level::$level).output(&args.to_string());
            }
        )*
    };
}

impl Logger {
    /// Root record bound to `sink`: level `debug`, no fields, no context,
    /// empty caller trace, live stack walking.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Logger {
            sink,
            stack: Arc::new(BacktraceStack),
            formatter: Formatter::default(),
            context: None,
            level: Level::default(),
            fields: FieldSet::new(),
            callers: Vec::new(),
        }
    }

    pub fn with_stack_provider(&self, stack: Arc<dyn StackProvider>) -> Self {
        Logger { stack, ..self.clone() }
    }

    pub fn with_time_format(&self, time_format: TimeFormat) -> Self {
        Logger {
            formatter: Formatter::new(time_format),
            ..self.clone()
        }
    }

    pub fn with_level(&self, level: Level) -> Self {
        Logger { level, ..self.clone() }
    }

    /// Record whose fields are the union of ours and `additions`. Keys we
    /// already carry keep their value.
    pub fn with_fields(&self, additions: Fields) -> Self {
        Logger {
            fields: self.fields.merged(additions),
            ..self.clone()
        }
    }

    /// Single-field form of [`Logger::with_fields`]. A value that fails to
    /// serialize turns the emitted event into a degraded one.
    pub fn with_field<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Self {
        Logger {
            fields: self.fields.merged_one(key, value),
            ..self.clone()
        }
    }

    pub fn with_context<C: Any + Send + Sync>(&self, context: C) -> Self {
        Logger {
            context: Some(Arc::new(context)),
            ..self.clone()
        }
    }

    /// Record whose caller trace is the single frame `skip` levels up from
    /// this call (0 is this method, 1 its caller). The trace is left as it
    /// was if that frame cannot be resolved.
    #[inline(never)]
    pub fn with_caller(&self, skip: usize) -> Self {
        let mut record = self.clone();
        if let Some(frame) = self.stack.frame(skip) {
            record.callers = vec![frame.to_string()];
        }
        record
    }

    /// Record whose caller trace is the stack from the caller of this method
    /// outward, at most [`MAX_CALLER_DEPTH`] frames.
    #[inline(never)]
    pub fn with_callers_frame(&self) -> Self {
        let callers = self
            .stack
            .frames(1, MAX_CALLER_DEPTH)
            .iter()
            .map(ToString::to_string)
            .collect();
        Logger { callers, ..self.clone() }
    }

    /// Record with an explicit caller trace.
    pub fn with_callers(&self, callers: Vec<String>) -> Self {
        Logger { callers, ..self.clone() }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn callers(&self) -> &[String] {
        &self.callers
    }

    /// The context, if one was attached and it is a `C`.
    pub fn context<C: Any>(&self) -> Option<&C> {
        self.context.as_deref().and_then(|ctx| ctx.downcast_ref::<C>())
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn formatter(&self) -> Formatter {
        self.formatter
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        self.sink.flush()
    }

    /// The event object this record would emit for `message`.
    pub fn format_event(&self, message: &str) -> Result<Map<String, Value>, FormatError> {
        self.formatter.format(self.level, message, &self.callers, &self.fields)
    }

    fn render(&self, message: &str) -> String {
        match self.formatter.encode(self.level, message, &self.callers, &self.fields) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(target: "record_logger", error = %e, "log event degraded");
                self.formatter.degraded(self.level, message, &self.callers, &e)
            }
        }
    }

    /// Render and write one line; returns the line for the termination hooks.
    fn emit(&self, message: &str) -> String {
        let line = self.render(message);
        if let Err(e) = self.sink.write_line(&line) {
            tracing::warn!(target: "record_logger", error = %e, level = %self.level, "log sink write failed");
        }
        line
    }

    /// Format `message` at this record's level, write it, and escalate for
    /// `fatal` (process exit) and `panic` (unwind).
    pub fn output(&self, message: &str) {
        let line = self.emit(message);
        match self.level {
            Level::Debug | Level::Info | Level::Warn | Level::Error => {}
            Level::Fatal => self.sink.on_fatal(&line),
            Level::Panic => self.sink.on_panic(&line),
        }
    }

    emitters! {
        Debug => debug, debugf;
        Info => info, infof;
        Warn => warn, warnf;
        Error => error, errorf;
    }

    /// Write a `fatal` event, then terminate through the sink's fatal hook.
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        let record = self.with_level(Level::Fatal);
        let line = record.emit(&message.to_string());
        record.sink.on_fatal(&line)
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.fatal(args)
    }

    /// Write a `panic` event, then unwind through the sink's panic hook.
    pub fn panic(&self, message: impl fmt::Display) -> ! {
        let record = self.with_level(Level::Panic);
        let line = record.emit(&message.to_string());
        record.sink.on_panic(&line)
    }

    pub fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        self.panic(args)
    }
}

/// Displays each value back to back, with no separator.
///
/// ```
/// use record_logger::Concat;
/// assert_eq!(Concat(&[&"user ", &7, &" logged in"]).to_string(), "user 7 logged in");
/// ```
pub struct Concat<'a>(pub &'a [&'a dyn fmt::Display]);

impl fmt::Display for Concat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.0 {
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
