// error.rs - Idiomatic Rust error types for pregex.
//
// Groups the numeric i32 error codes into semantic variants
// while keeping the numeric code available.

use std::fmt;

use crate::regdef::*;
use crate::regerror::pregex_error_code_to_format;

/// Error type for character-class, compilation and matching operations.
///
/// A failed match is never an error; matching functions return `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    /// Memory allocation failure.
    Memory,
    /// Invalid argument or call on an object in the wrong state.
    InvalidArgument,
    /// Syntax error in the pattern, with the byte position it was detected at.
    Syntax {
        code: i32,
        message: String,
        position: usize,
    },
    /// Character classes or machines built over different universes.
    IncompatibleDomain,
    /// Automaton invariant violated during construction.
    MalformedAutomaton { code: i32, message: String },
    /// Other error not covered by specific variants.
    Other(i32),
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexError::Memory => write!(f, "memory allocation failed"),
            RegexError::InvalidArgument => write!(f, "invalid argument"),
            RegexError::Syntax {
                message, position, ..
            } => write!(f, "syntax error: {} at position {}", message, position),
            RegexError::IncompatibleDomain => write!(f, "incompatible character universes"),
            RegexError::MalformedAutomaton { message, .. } => {
                write!(f, "malformed automaton: {}", message)
            }
            RegexError::Other(code) => write!(f, "error code {}", code),
        }
    }
}

impl std::error::Error for RegexError {}

impl From<i32> for RegexError {
    fn from(code: i32) -> Self {
        match code {
            PREGEX_ERR_MEMORY => RegexError::Memory,
            PREGEX_ERR_INVALID_ARGUMENT => RegexError::InvalidArgument,
            PREGEX_ERR_INCOMPATIBLE_DOMAIN => RegexError::IncompatibleDomain,

            c if pregex_is_automaton_error(c) => RegexError::MalformedAutomaton {
                code: c,
                message: pregex_error_code_to_format(c).to_string(),
            },

            // Syntax / pattern errors (range -100..-999)
            c if pregex_is_pattern_error(c) => RegexError::syntax(c, 0),

            _ => RegexError::Other(code),
        }
    }
}

impl RegexError {
    /// Build a syntax error for `code` detected at byte `position` of the pattern.
    pub fn syntax(code: i32, position: usize) -> Self {
        RegexError::Syntax {
            code,
            message: pregex_error_code_to_format(code).to_string(),
            position,
        }
    }

    /// Returns the numeric error code.
    pub fn code(&self) -> i32 {
        match self {
            RegexError::Memory => PREGEX_ERR_MEMORY,
            RegexError::InvalidArgument => PREGEX_ERR_INVALID_ARGUMENT,
            RegexError::IncompatibleDomain => PREGEX_ERR_INCOMPATIBLE_DOMAIN,
            RegexError::Syntax { code, .. } => *code,
            RegexError::MalformedAutomaton { code, .. } => *code,
            RegexError::Other(code) => *code,
        }
    }

    /// Byte position of a syntax error within the pattern.
    pub fn position(&self) -> Option<usize> {
        match self {
            RegexError::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_memory_error() {
        let err = RegexError::from(PREGEX_ERR_MEMORY);
        assert!(matches!(err, RegexError::Memory));
        assert_eq!(err.code(), PREGEX_ERR_MEMORY);
        assert_eq!(err.to_string(), "memory allocation failed");
    }

    #[test]
    fn from_syntax_error() {
        let err = RegexError::from(PREGEX_ERR_PREMATURE_END_OF_CHAR_CLASS);
        assert!(matches!(err, RegexError::Syntax { .. }));
        assert_eq!(err.code(), PREGEX_ERR_PREMATURE_END_OF_CHAR_CLASS);
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn syntax_error_position() {
        let err = RegexError::syntax(PREGEX_ERR_UNMATCHED_CLOSE_PARENTHESIS, 7);
        assert_eq!(err.position(), Some(7));
        assert_eq!(
            err.to_string(),
            "syntax error: unmatched close parenthesis at position 7"
        );
        assert_eq!(RegexError::InvalidArgument.position(), None);
    }

    #[test]
    fn from_automaton_error() {
        let err = RegexError::from(PREGEX_ERR_UNREACHABLE_ACCEPT);
        assert!(matches!(err, RegexError::MalformedAutomaton { .. }));
        assert_eq!(err.code(), PREGEX_ERR_UNREACHABLE_ACCEPT);
    }

    #[test]
    fn from_domain_error() {
        let err = RegexError::from(PREGEX_ERR_INCOMPATIBLE_DOMAIN);
        assert_eq!(err, RegexError::IncompatibleDomain);
    }

    #[test]
    fn from_unknown_code() {
        let err = RegexError::from(-9999);
        assert!(matches!(err, RegexError::Other(-9999)));
    }

    #[test]
    fn error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(RegexError::Memory);
        assert_eq!(err.to_string(), "memory allocation failed");
    }
}
