//! Caller-trace capture.
//!
//! Stack walking is a platform capability, so the logger only talks to the
//! [`StackProvider`] trait. [`BacktraceStack`] walks the real stack;
//! [`FixedStack`] hands out a prepared list of frames for deterministic use.

use serde::Serialize;
use std::fmt;

/// Upper bound on the number of frames kept by a full-stack capture.
pub const MAX_CALLER_DEPTH: usize = 25;

/// Function-name suffixes of the logger methods that start a capture.
/// Depth 0 is the innermost frame matching one of these.
const CAPTURE_ANCHORS: [&str; 2] = ["Logger::with_caller", "Logger::with_callers_frame"];

/// Frames walked before giving up on finding the capture anchor.
const WALK_LIMIT: usize = 256;

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Frame {
            file: file.into(),
            line,
            function: function.into(),
        }
    }
}

/// Renders as `"<file>: <line> <function>"`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.file, self.line, self.function)
    }
}

/// Source of caller frames.
///
/// Depths are relative to the logger method performing the capture:
/// depth 0 is that method, depth 1 its caller, and so on outward.
pub trait StackProvider: Send + Sync {
    /// Up to `max` resolvable frames starting at depth `skip`, innermost first.
    fn frames(&self, skip: usize, max: usize) -> Vec<Frame>;

    /// The single frame at depth `skip`, if it can be resolved.
    fn frame(&self, skip: usize) -> Option<Frame> {
        self.frames(skip, 1).into_iter().next()
    }
}

/// Walks the live call stack with the `backtrace` crate.
///
/// Frames without file and line information are skipped. Accuracy depends on
/// debug info being present in the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceStack;

impl BacktraceStack {
    fn resolved() -> Vec<Frame> {
        let mut frames = Vec::new();
        backtrace::trace(|raw| {
            backtrace::resolve_frame(raw, |symbol| {
                let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) else {
                    return;
                };
                let function = symbol
                    .name()
                    .map(|name| format!("{:#}", name))
                    .unwrap_or_else(|| "<unknown>".to_string());
                frames.push(Frame::new(file.display().to_string(), line, function));
            });
            frames.len() < WALK_LIMIT
        });
        frames
    }
}

fn is_anchor(function: &str) -> bool {
    CAPTURE_ANCHORS.iter().any(|anchor| function.ends_with(anchor))
}

impl StackProvider for BacktraceStack {
    fn frames(&self, skip: usize, max: usize) -> Vec<Frame> {
        let frames = Self::resolved();
        // Without an anchor (provider called directly) depth 0 is the first
        // frame after the provider itself.
        let origin = match frames.iter().position(|f| is_anchor(&f.function)) {
            Some(anchor) => anchor,
            None => frames
                .iter()
                .rposition(|f| f.function.contains("BacktraceStack"))
                .map_or(0, |last| last + 1),
        };
        frames.into_iter().skip(origin + skip).take(max).collect()
    }
}

/// Provider that serves a fixed list of frames, innermost (depth 0) first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedStack {
    frames: Vec<Frame>,
}

impl FixedStack {
    pub fn new(frames: Vec<Frame>) -> Self {
        FixedStack { frames }
    }

    /// A synthetic stack with a capture frame at depth 0 followed by `depth`
    /// caller frames named `frame_1 .. frame_<depth>`.
    pub fn synthetic(depth: usize) -> Self {
        let mut frames = vec![Frame::new("src/logger.rs", 1, "Logger::capture")];
        frames.extend((1..=depth).map(|i| Frame::new("src/app.rs", i as u32 * 10, format!("frame_{}", i))));
        FixedStack { frames }
    }
}

impl StackProvider for FixedStack {
    fn frames(&self, skip: usize, max: usize) -> Vec<Frame> {
        self.frames.iter().skip(skip).take(max).cloned().collect()
    }
}
