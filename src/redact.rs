//! Keeping API keys out of logs, errors and debug output.
//!
//! ```rust
//! use asesor::redact::RedactedString;
//!
//! let key = RedactedString::new("sk-1234567890abcdef");
//! assert_eq!(key.to_string(), "[REDACTED]");
//! assert_eq!(key.as_str(), "sk-1234567890abcdef");
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string whose value never appears in Display, Debug or serialized output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RedactedString {
    inner: String,
}

impl RedactedString {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Access the inner value, e.g. for an HTTP header. Never log it.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.trim().is_empty()
    }
}

impl fmt::Display for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedString(\"[REDACTED]\")")
    }
}

// Config files are written back without the key; the key has to come from
// the file it was read from or the environment.
impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for RedactedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Replace every occurrence of `secret` in `text` with `***REDACTED***`.
///
/// Upstream error bodies sometimes echo the submitted key back; this is
/// applied to them before they are stored in an error.
pub fn scrub(text: &str, secret: &RedactedString) -> String {
    let key = secret.as_str().trim();
    if key.len() < 4 {
        return text.to_owned();
    }
    text.replace(key, "***REDACTED***")
}

/// Redact `Bearer TOKEN` occurrences.
pub fn redact_bearer(s: &str) -> String {
    let Some(pos) = s.to_ascii_lowercase().find("bearer ") else {
        return s.to_owned();
    };
    let before = &s[..pos + 7];
    let after = &s[pos + 7..];
    let token_end = after
        .find(|c: char| c.is_whitespace() || c == '"' || c == ',')
        .unwrap_or(after.len());
    format!("{before}***REDACTED***{}", &after[token_end..])
}
