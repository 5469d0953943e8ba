pub mod level;
pub mod fields;
pub mod stack;
pub mod format;
pub mod logger;
pub mod sink;
pub mod layer;

#[cfg(feature = "rolling-file")]
pub mod file_sink;

pub mod channel_sink;
pub mod config;
pub mod env;
pub mod init;
pub mod memory_sink;
pub mod noop_sink;

pub use fields::{FieldSet, Fields};
pub use format::{FormatError, Formatter, TimeFormat};
pub use level::Level;
pub use logger::{Concat, Logger};
pub use sink::{FanoutSink, LogSink, SinkError, WriterSink};
pub use stack::{BacktraceStack, FixedStack, Frame, StackProvider};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

/// Build a [`Fields`] map from `key => value` pairs. Values go through
/// `serde_json::json!`.
///
/// ```
/// let fields = record_logger::fields! { "user" => "ana", "attempt" => 2 };
/// assert_eq!(fields["attempt"], 2);
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::Fields::new();
        $(
            map.insert(::std::string::String::from($key), $crate::__private::serde_json::json!($value));
        )*
        map
    }};
}
