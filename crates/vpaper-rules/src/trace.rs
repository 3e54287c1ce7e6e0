//! Ordered, leveled trace of a rule test run.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Verbosity of a trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Info,
    Warn,
}

/// One human-readable line of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLine {
    pub level: TraceLevel,
    pub message: String,
}

/// Recorder for the steps taken while evaluating a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    lines: Vec<TraceLine>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(TraceLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(TraceLevel::Warn, message.into());
    }

    fn push(&mut self, level: TraceLevel, message: String) {
        self.lines.push(TraceLine { level, message });
    }

    pub fn lines(&self) -> &[TraceLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render as text, one line each. Warnings carry a `warning - ` prefix.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line.level {
                TraceLevel::Info => {
                    let _ = writeln!(out, "{}", line.message);
                }
                TraceLevel::Warn => {
                    let _ = writeln!(out, "warning - {}", line.message);
                }
            }
        }
        out
    }
}

/// Record an info line when a trace is attached.
pub(crate) fn info(trace: &mut Option<&mut Trace>, message: impl FnOnce() -> String) {
    if let Some(t) = trace.as_deref_mut() {
        t.info(message());
    }
}

/// Record a warning line when a trace is attached.
pub(crate) fn warn(trace: &mut Option<&mut Trace>, message: impl FnOnce() -> String) {
    if let Some(t) = trace.as_deref_mut() {
        t.warn(message());
    }
}
