//! Error types for the graph layer.

/// Errors raised while parsing serialized graph text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// General syntax error at a known line
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A qualified name referenced a prefix with no declaration
    #[error("undeclared prefix '{prefix}:' at line {line}")]
    UndeclaredPrefix { line: usize, prefix: String },

    /// String literal never closed
    #[error("unterminated string literal starting at line {line}")]
    UnterminatedString { line: usize },

    /// IRI reference never closed
    #[error("unterminated IRI reference starting at line {line}")]
    UnterminatedIri { line: usize },

    /// Bare numeral followed by a datatype marker; typed literals
    /// require a quoted lexical form
    #[error("typed literal at line {line} requires a quoted lexical form")]
    UnquotedTypedNumber { line: usize },
}

impl ParseError {
    /// Line number the error was detected on.
    #[inline]
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Syntax { line, .. }
            | Self::UndeclaredPrefix { line, .. }
            | Self::UnterminatedString { line }
            | Self::UnterminatedIri { line }
            | Self::UnquotedTypedNumber { line } => *line,
        }
    }
}

/// Sanitization failure: input that no repair rule could make parseable.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    /// Input still fails to parse after every repair rule was applied.
    /// Carries the raw input so the caller can persist it for auditing.
    #[error("unrecoverable generator output: {reason}")]
    Unrecoverable { raw: String, reason: ParseError },
}

impl SanitizeError {
    /// The raw text that could not be repaired.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Unrecoverable { raw, .. } => raw,
        }
    }
}
