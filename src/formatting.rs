// src/formatting.rs

use crate::core::LogRecord;
use chrono::{DateTime, Local};

/// Layout of the timestamp segment, e.g. `[2025-07-08 21:03:52.041]`.
const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S%.3f]";

/// Renders a record as `[TAG][timestamp] LABEL <id-or-colon> message\n`.
pub fn render_record(record: &LogRecord) -> String {
    let correlation = match &record.correlation_id {
        Some(id) => format!("[{}]", id),
        None => ":".to_string(),
    };

    format!(
        "[{}]{} {} {} {}\n",
        record.module_tag,
        format_timestamp(&record.timestamp),
        record.severity.label(),
        correlation,
        trim_trailing_newline(record.message.body()),
    )
}

/// Formats a local timestamp with millisecond precision.
fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Escapes the characters the chat endpoint's markdown parser treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn trim_trailing_newline(body: &str) -> &str {
    body.trim_end_matches(['\n', '\r'])
}
