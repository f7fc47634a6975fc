//! Markup string types.
//!
//! [`RawMarkup`] is untrusted diagram source as received from a generator or
//! a user edit. [`SanitizedMarkup`] can only be produced by
//! [`sanitize`](crate::sanitize::sanitize) and is guaranteed to carry no
//! leading or trailing code fences and no surrounding whitespace. It is *not*
//! guaranteed to be syntactically valid.

use std::fmt;

use serde::Deserialize;

/// Unvalidated diagram source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct RawMarkup(String);

impl RawMarkup {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when there is nothing but whitespace to render.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RawMarkup {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl From<&str> for RawMarkup {
    fn from(source: &str) -> Self {
        Self(source.to_string())
    }
}

impl AsRef<str> for RawMarkup {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Diagram source after fence stripping, trimming, and rule rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SanitizedMarkup(String);

impl SanitizedMarkup {
    pub(crate) fn new(source: String) -> Self {
        Self(source)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty result means "nothing to render", not a sanitizer failure.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for SanitizedMarkup {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for SanitizedMarkup {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SanitizedMarkup {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
