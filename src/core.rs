//! Core domain types and seams for escalog
//!
//! This module defines the record model shared by every channel and the
//! trait contracts the logger uses to reach the outside world.

use chrono::{DateTime, Local};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warn,
    Error,
    /// Reserved for failures of the logging machinery itself.
    Critical,
}

impl Severity {
    /// The fixed label written into every record.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO ",
            Self::Warn => "WARN ",
            Self::Error => "ERROR",
            Self::Critical => "*CRITICAL*",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The body of a log record.
///
/// Errors that carry a trace are logged with the trace instead of their
/// short description, so the record stays debuggable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Error {
        description: String,
        trace: Option<String>,
    },
}

impl Message {
    /// Builds a message from any standard error value.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Self::Error {
            description: err.to_string(),
            trace: None,
        }
    }

    /// The text that ends up in the record.
    pub fn body(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Error {
                trace: Some(trace), ..
            } => trace,
            Self::Error { description, .. } => description,
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&anyhow::Error> for Message {
    fn from(err: &anyhow::Error) -> Self {
        use std::backtrace::BacktraceStatus;

        let trace = match err.backtrace().status() {
            BacktraceStatus::Captured => Some(format!("{:?}", err)),
            _ => None,
        };
        Self::Error {
            description: err.to_string(),
            trace,
        }
    }
}

impl From<anyhow::Error> for Message {
    fn from(err: anyhow::Error) -> Self {
        Self::from(&err)
    }
}

/// A single event to be logged. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: Severity,
    pub module_tag: String,
    pub correlation_id: Option<String>,
    pub message: Message,
    pub timestamp: DateTime<Local>,
}

impl LogRecord {
    /// Creates a record stamped with the local wall clock.
    pub fn new(
        severity: Severity,
        module_tag: &str,
        message: Message,
        correlation_id: Option<&str>,
    ) -> Self {
        Self::at(severity, module_tag, message, correlation_id, Local::now())
    }

    /// Creates a record with an explicit timestamp.
    pub fn at(
        severity: Severity,
        module_tag: &str,
        message: Message,
        correlation_id: Option<&str>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            severity,
            module_tag: module_tag.to_string(),
            correlation_id: correlation_id.map(str::to_string),
            message,
            timestamp,
        }
    }

    /// Renders the record with the fixed single-record layout.
    pub fn render(&self) -> RenderedText {
        RenderedText(crate::formatting::render_record(self))
    }
}

/// The rendered form of a record, shared read-only by every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText(String);

impl RenderedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The variant sent to the chat channel when rich text is requested.
    pub fn escaped(&self) -> String {
        crate::formatting::escape_markdown(&self.0)
    }
}

impl fmt::Display for RenderedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RenderedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The immutable payload of one dispatch call, shared by every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Module tag at the time the record was created.
    pub module_tag: String,
    pub correlation_id: Option<String>,
    pub text: RenderedText,
}

impl Alert {
    pub fn from_record(record: &LogRecord) -> Self {
        Self {
            module_tag: record.module_tag.clone(),
            correlation_id: record.correlation_id.clone(),
            text: record.render(),
        }
    }
}

/// One of the independent delivery paths for an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Sink,
    Chat,
    Mail,
}

impl Channel {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sink => "sink",
            Self::Chat => "chat",
            Self::Mail => "mail",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a single channel attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The channel is not configured.
    Skipped,
    Delivered,
    /// The attempt failed, or the channel was only partially configured.
    Failed,
    /// Both the primary attempt and its single fallback failed.
    FailedAfterFallback,
}

/// Terminal state of a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Every channel attempt completed.
    Joined,
    /// The deadline fired first; unfinished attempts were abandoned.
    TimedOut,
    /// The fan-out could not be started; only the sink was attempted.
    Aborted,
}

/// Per-channel outcomes of one dispatch call.
///
/// A channel whose attempt had not finished when the join returned has no
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub state: DispatchState,
    pub sink: Option<ChannelOutcome>,
    pub chat: Option<ChannelOutcome>,
    pub mail: Option<ChannelOutcome>,
}

impl DispatchReport {
    pub(crate) fn new(state: DispatchState) -> Self {
        Self {
            state,
            sink: None,
            chat: None,
            mail: None,
        }
    }

    pub(crate) fn record(&mut self, channel: Channel, outcome: ChannelOutcome) {
        let slot = match channel {
            Channel::Sink => &mut self.sink,
            Channel::Chat => &mut self.chat,
            Channel::Mail => &mut self.mail,
        };
        *slot = Some(outcome);
    }

    pub fn outcome(&self, channel: Channel) -> Option<ChannelOutcome> {
        match channel {
            Channel::Sink => self.sink,
            Channel::Chat => self.chat,
            Channel::Mail => self.mail,
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// The process console: where every record and every meta-error is printed.
pub trait Console: Send + Sync {
    /// Writes a regular record (info, warn).
    fn out(&self, text: &str);

    /// Writes an error record or a meta-error.
    fn err(&self, text: &str);
}

/// Console backed by the process's stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn out(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn err(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    }
}

pub type SharedConsole = Arc<dyn Console>;
