//! API key validation and secret handling.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::LazyLock};

const MIN_LEN: usize = 24;
const MAX_LEN: usize = 100;

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sk-[A-Za-z0-9_-]{20,}$").expect("API key pattern is a valid regex")
});

/// Raised before any network call when a key cannot possibly be valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("API key is empty")]
    Empty,
    #[error("API key must be between {MIN_LEN} and {MAX_LEN} characters (got {0})")]
    Length(usize),
    #[error("Invalid API key format")]
    Format,
}

/// A validated API key.
///
/// The key is kept inside a secret wrapper so it never shows up in `Debug`
/// output or logs; it is exposed only when building an `Authorization` header.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Validates `raw` and wraps it.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validate(raw)?;
        Ok(Self(SecretString::from(raw.trim().to_string())))
    }

    /// Value for an HTTP `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Checks a raw key against the accepted format without keeping it.
pub fn validate(raw: &str) -> Result<(), ValidationError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = key.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(ValidationError::Length(len));
    }
    if !KEY_PATTERN.is_match(key) {
        return Err(ValidationError::Format);
    }
    Ok(())
}

pub fn is_valid(raw: &str) -> bool {
    validate(raw).is_ok()
}
