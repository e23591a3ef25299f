//! Field scrubbing applied to a record's JSON payload before it leaves the process.

use regex::Regex;
use serde_json::Value;

const REDACTED: &str = "[REDACTED]";

/// Body fields subject to redaction.
const BODY_FIELDS: [&str; 2] = ["prompt", "response"];

/// Free-form fields subject to truncation. Identifiers and labels are left whole.
const TRUNCATED_FIELDS: [&str; 4] = ["prompt", "response", "image", "revisedPrompt"];

#[derive(Clone, Debug, Default)]
pub struct Sanitizer {
    redact: Option<Regex>,
    max_field_bytes: Option<usize>,
}

impl Sanitizer {
    pub fn new(redact: Option<Regex>, max_field_bytes: Option<usize>) -> Self {
        Self {
            redact,
            max_field_bytes,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.redact.is_none() && self.max_field_bytes.is_none()
    }

    /// Redacts body fields, then truncates the free-form text fields.
    pub fn apply(&self, payload: &mut Value) {
        let Value::Object(fields) = payload else {
            return;
        };

        if let Some(pattern) = &self.redact {
            for key in BODY_FIELDS {
                if let Some(Value::String(text)) = fields.get_mut(key) {
                    *text = redact_text(text, pattern);
                }
            }
        }

        if let Some(max_bytes) = self.max_field_bytes {
            for key in TRUNCATED_FIELDS {
                if let Some(Value::String(text)) = fields.get_mut(key) {
                    truncate_in_place(text, max_bytes);
                }
            }
        }
    }
}

pub fn redact_text(text: &str, pattern: &Regex) -> String {
    pattern.replace_all(text, REDACTED).into_owned()
}

/// Cuts `text` to at most `max_bytes`, backing off to a char boundary.
pub fn truncate_text(text: &str, max_bytes: usize) -> String {
    let mut owned = text.to_string();
    truncate_in_place(&mut owned, max_bytes);
    owned
}

fn truncate_in_place(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
