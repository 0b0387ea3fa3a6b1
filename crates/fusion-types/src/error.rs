//! Error types shared across the Fusion interpreter.

use thiserror::Error;

/// Errors raised while parsing or evaluating Fusion configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Malformed source text. Parsing aborts at the first syntax error;
    /// no partial tree is returned.
    #[error("syntax error in line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A DSL literal names an unknown transpiler, or transpilation failed.
    #[error("dsl error: {0}")]
    Dsl(String),

    /// The configuration itself is broken: missing prototype ancestor,
    /// recursive inheritance, illegal prototype copy, unresolved `@class`,
    /// an uncached segment without context dependencies, and the like.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A failure while evaluating a path at runtime: expression failure,
    /// renderer failure, non-boolean `@if` guard.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

impl FusionError {
    /// Create a syntax error for the given 1-based line number.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Result type used throughout the Fusion interpreter.
pub type FusionResult<T> = std::result::Result<T, FusionError>;
