use std::fmt;

/// Registration error
///
/// Returned by [`RouteCache::add_route`](super::RouteCache::add_route) and
/// friends. Every variant is fatal at startup: a table that failed to build
/// must not serve traffic. Lookups never produce a `RouteError`.
#[derive(Debug, Clone)]
pub enum RouteError {
    /// The pattern is syntactically malformed
    ///
    /// Unbalanced `{`/`}`, an empty parameter name, a catch-all that is not the
    /// last segment, two dynamic markers in one path segment, or a pattern that
    /// does not start with `/`.
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Human readable description of the problem
        reason: String,
    },
    /// The pattern collides with an existing registration
    ///
    /// Either the same verb is already bound at the terminal node, or a dynamic
    /// segment is incompatible with the dynamic child already present at the
    /// same trie position.
    PatternConflict {
        /// The pattern being registered
        pattern: String,
        /// Pattern text up to the ambiguous position
        prefix: String,
        /// What it conflicts with
        reason: String,
    },
    /// The body of a `{name:regexp}` segment failed to compile
    RegexCompileError {
        /// The offending pattern
        pattern: String,
        /// Name of the parameter carrying the regex
        name: String,
        /// Underlying compiler error
        source: regex::Error,
    },
    /// All verb bits of the mask are already assigned
    VerbLimit {
        /// The method that could not be registered
        method: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(pattern: &str, prefix: &str, reason: impl Into<String>) -> Self {
        RouteError::PatternConflict {
            pattern: pattern.to_string(),
            prefix: prefix.to_string(),
            reason: reason.into(),
        }
    }

    /// The pattern this error was raised for, if any.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            RouteError::InvalidPattern { pattern, .. }
            | RouteError::PatternConflict { pattern, .. }
            | RouteError::RegexCompileError { pattern, .. } => Some(pattern),
            RouteError::VerbLimit { .. } => None,
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern '{}': {}", pattern, reason)
            }
            RouteError::PatternConflict {
                pattern,
                prefix,
                reason,
            } => {
                write!(
                    f,
                    "route pattern '{}' conflicts at prefix '{}': {}",
                    pattern, prefix, reason
                )
            }
            RouteError::RegexCompileError {
                pattern,
                name,
                source,
            } => {
                write!(
                    f,
                    "invalid regular expression for parameter '{}' in route pattern '{}': {}",
                    name, pattern, source
                )
            }
            RouteError::VerbLimit { method } => {
                write!(
                    f,
                    "cannot register HTTP method '{}': all {} verb slots are in use",
                    method,
                    crate::verb::MAX_VERBS
                )
            }
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::RegexCompileError { source, .. } => Some(source),
            _ => None,
        }
    }
}
