//! Print Job Model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Max characters kept in [`PrintJob::preview_text`]
pub const PREVIEW_MAX_CHARS: usize = 100;

/// One framed print stream received by the virtual printer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: Uuid,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub byte_size: usize,
    pub status: PrintJobStatus,
    pub preview_text: String,
    pub recipe_number: Option<String>,
}

impl PrintJob {
    /// Build the preview shown in job lists: newline runs become a single
    /// space, then the text is cut to [`PREVIEW_MAX_CHARS`] characters.
    pub fn make_preview(text: &str) -> String {
        let mut preview = String::with_capacity(PREVIEW_MAX_CHARS);
        let mut count = 0;
        let mut in_break = false;
        for c in text.chars() {
            if count >= PREVIEW_MAX_CHARS {
                break;
            }
            if c == '\r' || c == '\n' {
                if !in_break {
                    preview.push(' ');
                    count += 1;
                    in_break = true;
                }
                continue;
            }
            in_break = false;
            preview.push(c);
            count += 1;
        }
        preview
    }
}

/// Parse outcome of a print job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintJobStatus {
    /// A recipe was found
    Success,
    /// No recipe in the stream; not an error
    Failed,
}

/// Virtual printer state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterState {
    #[default]
    Idle,
    Receiving,
    Processing,
    Error,
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Receiving => write!(f, "receiving"),
            Self::Processing => write!(f, "processing"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_collapses_newlines() {
        assert_eq!(PrintJob::make_preview("a\r\nb\n\nc"), "a b c");
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        let text = "é".repeat(150);
        let preview = PrintJob::make_preview(&text);
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(PrintJob::make_preview("Fórmula: 12"), "Fórmula: 12");
    }
}
