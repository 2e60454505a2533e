//! Input references: where an input artifact's bytes come from.

use std::fmt;

/// A job input, either fetched from a remote locator or carried inline.
///
/// Inline payloads keep their standard-base64 text form here; decoding
/// happens once, when the payload is materialized on disk.
#[derive(Clone, PartialEq, Eq)]
pub enum InputReference {
    /// An `http://` or `https://` URL.
    Remote(String),
    /// Base64-encoded bytes.
    Inline(String),
}

impl InputReference {
    /// Classify a raw request field.
    ///
    /// Anything starting with an http(s) scheme is remote; everything else
    /// is treated as inline encoded bytes.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            InputReference::Remote(trimmed.to_string())
        } else {
            InputReference::Inline(trimmed.to_string())
        }
    }

    /// Whether this reference needs a network fetch.
    pub fn is_remote(&self) -> bool {
        matches!(self, InputReference::Remote(_))
    }

    /// Short label for logs; never includes inline payload bytes.
    pub fn label(&self) -> String {
        match self {
            InputReference::Remote(url) => url.clone(),
            InputReference::Inline(data) => format!("<inline, {} encoded bytes>", data.len()),
        }
    }
}

impl fmt::Debug for InputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputReference::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
            InputReference::Inline(data) => f
                .debug_tuple("Inline")
                .field(&format_args!("{} bytes", data.len()))
                .finish(),
        }
    }
}
