//! Process-wide logger settings shared by the facade and every channel task.

use crate::core::{LogRecord, Message, Severity, SharedConsole};
use crate::error::MetaError;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Mutable-at-runtime settings plus the console every report goes to.
pub struct LoggerContext {
    module_tag: ArcSwap<String>,
    dispatch_timeout_ms: AtomicU64,
    console: SharedConsole,
}

impl LoggerContext {
    pub fn new(module_tag: &str, dispatch_timeout: Duration, console: SharedConsole) -> Self {
        Self {
            module_tag: ArcSwap::from_pointee(module_tag.to_string()),
            dispatch_timeout_ms: AtomicU64::new(duration_to_millis(dispatch_timeout)),
            console,
        }
    }

    pub fn module_tag(&self) -> Arc<String> {
        self.module_tag.load_full()
    }

    pub fn set_module_tag(&self, name: &str) {
        self.module_tag.store(Arc::new(name.to_string()));
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_dispatch_timeout(&self, timeout: Duration) {
        self.dispatch_timeout_ms
            .store(duration_to_millis(timeout), Ordering::Relaxed);
    }

    pub fn console(&self) -> &SharedConsole {
        &self.console
    }

    /// Creates a record stamped with the current module tag.
    pub fn record(
        &self,
        severity: Severity,
        message: Message,
        correlation_id: Option<&str>,
    ) -> LogRecord {
        LogRecord::new(severity, &self.module_tag(), message, correlation_id)
    }

    /// Prints a meta-error as a critical record on the console.
    ///
    /// Meta-errors never go to the sink or the notification channels.
    pub fn report(&self, err: &MetaError, correlation_id: Option<&str>) {
        debug!(error = %err, "Reporting meta-error");
        let record = self.record(
            Severity::Critical,
            Message::Text(err.to_string()),
            correlation_id,
        );
        self.console.err(record.render().as_str());
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
