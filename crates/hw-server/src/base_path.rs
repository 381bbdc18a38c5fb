//! URL prefix under which the static root is exposed.

use std::fmt;
use std::str::FromStr;

use crate::error::ServerError;

/// Normalized base path: either `/` or `/seg/` (one or more segments).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BasePath(String);

impl BasePath {
    /// The root base path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Normalize a user-supplied base path.
    ///
    /// Surrounding slashes are optional (`docs`, `/docs`, `/docs/` all give
    /// `/docs/`). An empty value means `/`. Segments may not be empty, `.`,
    /// `..`, or contain `~`, `?`, `#`, `\` or whitespace.
    pub fn parse(raw: &str) -> Result<Self, ServerError> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let valid = trimmed.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && !segment.contains(['~', '?', '#', '\\'])
                && !segment.chars().any(char::is_whitespace)
        });
        if !valid {
            return Err(ServerError::InvalidBasePath(raw.to_owned()));
        }

        Ok(Self(format!("/{trimmed}/")))
    }

    /// The normalized prefix, always starting and ending with `/`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the root base path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Remainder of `path` below this prefix, or `None` if it lies outside.
    #[must_use]
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.0.as_str())
    }
}

impl Default for BasePath {
    fn default() -> Self {
        Self::root()
    }
}

impl FromStr for BasePath {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
