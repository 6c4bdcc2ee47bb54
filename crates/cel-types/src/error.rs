//! Type expression errors

use thiserror::Error;

/// Errors produced while parsing a written type such as `map(string, list(int))`
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A character that cannot start or continue a type expression
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// Offending character
        ch: char,
        /// Byte offset into the input
        offset: usize,
    },

    /// Input ended early
    #[error("unexpected end of type expression, expected {expected}")]
    UnexpectedEnd {
        /// What the parser was looking for
        expected: &'static str,
    },

    /// Trailing input after a complete type
    #[error("trailing input at offset {offset}")]
    TrailingInput {
        /// Byte offset of the first unconsumed character
        offset: usize,
    },

    /// A built-in type written with the wrong number of parameters
    #[error("type '{name}' expects {expected} parameter(s), got {actual}")]
    InvalidParameterCount {
        /// Type name
        name: String,
        /// Expected parameter count
        expected: usize,
        /// Actual parameter count
        actual: usize,
    },
}
