//! Value escaping for tab-delimited event lines
//!
//! Tabs and newlines inside a value would split a field or a line, so both are
//! replaced with their two-character backslash forms. Nothing else changes.

use std::fmt::Display;

/// Rendered form of an absent value
pub const NULL: &str = "null";

/// Escape a displayable value (`None` renders as `null`)
pub fn escape<T: Display + ?Sized>(value: Option<&T>) -> String {
    match value {
        Some(v) => escape_text(&v.to_string()),
        None => NULL.to_string(),
    }
}

/// Escape already-rendered text (`None` renders as `null`)
pub fn escape_str(value: Option<&str>) -> String {
    match value {
        Some(v) => escape_text(v),
        None => NULL.to_string(),
    }
}

fn escape_text(text: &str) -> String {
    // Fast path: most values carry no control characters
    if !text.contains(['\t', '\n']) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}
