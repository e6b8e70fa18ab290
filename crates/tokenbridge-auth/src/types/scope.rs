//! OAuth 2.0 scope values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter between scope names in the `scope` request parameter.
pub const SCOPE_DELIMITER: char = ' ';

/// A named permission unit attached to a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Creates a scope from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the scope name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a `scope` parameter into scope names.
///
/// Empty fragments (leading, trailing or repeated delimiters) are dropped.
#[must_use]
pub fn parse_scope_list(scopes: &str) -> Vec<&str> {
    scopes
        .split(SCOPE_DELIMITER)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Joins scopes back into their wire format.
#[must_use]
pub fn format_scopes(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
