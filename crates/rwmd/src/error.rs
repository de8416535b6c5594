//! Error type for markdown construction and I/O.
//!
//! Document content never produces an error. Only configuration mistakes
//! (unknown plugins, bad rule anchors, invalid patterns) and I/O failures
//! surface through [`Error`].

use std::path::PathBuf;

/// Markdown engine error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plugin name not known to the builtin table.
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),
    /// Renderer name not known (`html` or `ast`).
    #[error("Unknown renderer: {0}")]
    UnknownRenderer(String),
    /// Rule registration referenced a missing `before` anchor.
    #[error("Cannot register rule {rule:?} before unknown rule {before:?}")]
    UnknownRule {
        /// Rule being registered.
        rule: String,
        /// Anchor that does not exist.
        before: String,
    },
    /// Rule pattern failed to compile (alone or combined with other rules).
    #[error("Invalid pattern for {name:?}: {source}")]
    Pattern {
        /// Rule name (or `|`-joined rule names for combined scanners).
        name: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// Rule name already registered.
    #[error("Rule already registered: {0}")]
    DuplicateRule(String),
    /// Renderer has no method for a token type.
    #[error("No render method for token type {0:?}")]
    MissingRenderMethod(String),
    /// Rendering requested while running in AST mode.
    #[error("No renderer configured (AST mode), use tokens() instead")]
    NoRenderer,
    /// I/O error reading a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// I/O error reading an included file.
    #[error("Failed to include {}: {source}", .path.display())]
    Include {
        /// Resolved path of the included file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_rule_message() {
        let err = Error::UnknownRule {
            rule: "math".to_owned(),
            before: "nope".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            r#"Cannot register rule "math" before unknown rule "nope""#
        );
    }

    #[test]
    fn test_include_message() {
        let err = Error::Include {
            path: PathBuf::from("docs/a.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Failed to include docs/a.md: denied");
    }
}
