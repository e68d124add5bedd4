//! Structured error reports for failed invocations.

use crate::error::HandlerError;
use pontoon_core::BridgeSettings;
use serde::Serialize;
use serde_json::{Value, json};

/// The body of a 500 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Short type name of the error.
    pub error: String,
    /// Error message.
    pub detail: String,
    /// Rendered error chain and backtrace, when diagnostics are verbose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    /// Whether `traceback` was cut to the byte budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback_truncated: Option<bool>,
}

impl ErrorReport {
    /// Returns the report as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|err| {
            json!({
                "error": self.error,
                "detail": format!("{} (report encoding failed: {err})", self.detail),
            })
        })
    }
}

/// Builds the report for `err`.
///
/// A traceback is attached only when the settings are verbose. It keeps at
/// most `traceback_frames` frames and `traceback_bytes` bytes; a cut
/// traceback ends in `...` and is flagged.
#[must_use]
pub fn format_error(err: &HandlerError, settings: &BridgeSettings) -> ErrorReport {
    let mut report = ErrorReport {
        error: err.kind().to_string(),
        detail: err.to_string(),
        traceback: None,
        traceback_truncated: None,
    };

    if settings.verbose() {
        let traceback = err.traceback(settings.traceback_frames());
        let budget = settings.traceback_bytes();
        if traceback.len() > budget {
            report.traceback = Some(format!("{}...", truncate_utf8(&traceback, budget)));
            report.traceback_truncated = Some(true);
        } else {
            report.traceback = Some(traceback);
            report.traceback_truncated = Some(false);
        }
    }

    report
}

/// Returns the longest prefix of `text` that fits in `max_bytes` without
/// splitting a character.
#[must_use]
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
