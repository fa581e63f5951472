//! EPIC identifier type and text search
//!
//! An identifier is three uppercase letters followed by seven digits
//! (`ABC1234567`). Text is searched with two ordered patterns:
//!
//! 1. A label (`EPIC No` or `Identity Card`) followed anywhere later by a token
//! 2. A bare token anywhere in the text
//!
//! The labeled pattern is tried against the whole text before the bare pattern.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Label followed (possibly across lines) by a token. Case-insensitive.
static LABELED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:EPIC No|Identity Card)\s*.*?\s*\b([A-Z]{3}[0-9]{7})\b")
        .expect("labeled identifier pattern is valid")
});

/// Bare token anywhere in the text
static BARE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{3}[0-9]{7})\b").expect("bare identifier pattern is valid")
});

/// Whole-string strict form
static STRICT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{3}[0-9]{7}$").expect("strict identifier pattern is valid")
});

/// A voter identity (EPIC) number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Accept a string only if it already is a well-formed identifier
    pub fn parse(value: &str) -> Option<Self> {
        STRICT_PATTERN
            .is_match(value)
            .then(|| Self(value.to_string()))
    }

    /// Normalize a user-supplied claim for comparison (trim + uppercase)
    pub fn normalize_claim(value: &str) -> String {
        value.trim().to_uppercase()
    }

    /// Build from a pattern capture, re-checked against the strict form
    fn from_capture(captured: &str) -> Option<Self> {
        Self::parse(&captured.trim().replace(' ', "").to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier equals a user-supplied claim after normalization
    pub fn matches_claim(&self, claim: &str) -> bool {
        self.0 == Self::normalize_claim(claim)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Search text for an identifier, labeled pattern first
pub fn find_identifier(text: &str) -> Option<Identifier> {
    if text.is_empty() {
        return None;
    }

    [&*LABELED_PATTERN, &*BARE_PATTERN]
        .into_iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| Identifier::from_capture(m.as_str()))
}
