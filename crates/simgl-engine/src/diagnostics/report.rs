use std::backtrace::Backtrace;
use std::fmt::{self, Write as _};

use log::{debug, error};

/// One parsed backtrace frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub symbol: String,
    /// `path:line:col`, when the backtrace carries it.
    pub location: Option<String>,
}

impl Frame {
    fn path(&self) -> Option<&str> {
        self.location.as_deref().map(|l| l.trim_start_matches("./"))
    }
}

/// Error message plus a backtrace split into application frames (head) and
/// everything below the first external frame (tail).
///
/// Observational only: building or logging a report never affects control
/// flow.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    message: String,
    head: Vec<Frame>,
    tail: Vec<Frame>,
}

/// Frames of the capture machinery itself, dropped from the top.
const CAPTURE_FRAMES: &[&str] = &["std::backtrace", "anyhow::", "<anyhow::", "<E as anyhow::"];

impl ErrorReport {
    /// Builds a report from a captured backtrace. A frame belongs to the
    /// application when its source path starts with one of `app_prefixes`.
    pub fn new(message: impl fmt::Display, backtrace: &Backtrace, app_prefixes: &[&str]) -> Self {
        Self::from_frames(message, parse_frames(&backtrace.to_string()), app_prefixes)
    }

    pub fn from_frames(message: impl fmt::Display, frames: Vec<Frame>, app_prefixes: &[&str]) -> Self {
        let is_app = |f: &Frame| {
            f.path()
                .is_some_and(|p| app_prefixes.iter().any(|prefix| p.starts_with(prefix)))
        };

        let mut frames = frames
            .into_iter()
            .skip_while(|f| CAPTURE_FRAMES.iter().any(|c| f.symbol.starts_with(c)))
            .peekable();

        let mut head = Vec::new();
        while let Some(f) = frames.next_if(|f| is_app(f)) {
            head.push(f);
        }
        Self { message: message.to_string(), head, tail: frames.collect() }
    }

    #[inline]
    pub fn head(&self) -> &[Frame] {
        &self.head
    }

    #[inline]
    pub fn tail(&self) -> &[Frame] {
        &self.tail
    }

    /// Logs the message and head at error level, the tail at debug level.
    pub fn log(&self) {
        error!("{}", self.message);
        for f in &self.head {
            error!("  at {}", describe(f));
        }
        if !self.tail.is_empty() {
            error!("  ... {} external frame(s)", self.tail.len());
            for f in &self.tail {
                debug!("      {}", describe(f));
            }
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        for frame in &self.head {
            writeln!(f, "  at {}", describe(frame))?;
        }
        if !self.tail.is_empty() {
            writeln!(f, "  ... {} external frame(s)", self.tail.len())?;
        }
        Ok(())
    }
}

fn describe(frame: &Frame) -> String {
    let mut s = frame.symbol.clone();
    if let Some(loc) = &frame.location {
        let _ = write!(s, " ({loc})");
    }
    s
}

/// Parses the `Display` form of a [`Backtrace`]:
///
/// ```text
///    0: crate::module::function
///              at ./src/module.rs:10:5
/// ```
fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(loc) = trimmed.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.location.get_or_insert_with(|| loc.to_string());
            }
            continue;
        }
        if let Some((index, symbol)) = trimmed.split_once(": ") {
            if index.chars().all(|c| c.is_ascii_digit()) && !index.is_empty() {
                frames.push(Frame { symbol: symbol.to_string(), location: None });
            }
        }
    }
    frames
}
