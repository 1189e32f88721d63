//! Error types for grammar compilation and parsing.
//!
//! A parse either fully matches or returns a single [`Error`] carrying a
//! position and expected-versus-found wording. Compilation errors name the
//! offending struct and field.

use crate::token::{Position, Token};
use std::fmt;

/// Error type for grammar compilation, lexing and parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The grammar description could not be compiled
    Compile {
        /// Name of the output struct being compiled
        strct: String,
        /// Field within the struct, when attributable
        field: Option<String>,
        /// Reason the compilation failed
        message: String,
    },

    /// The matching engine could not advance at a position
    UnexpectedToken {
        /// The offending token (possibly the end-of-input marker)
        token: Token,
        /// What the grammar expected instead
        expected: String,
    },

    /// The token source failed to tokenize the input
    Lex {
        /// Description of the lexing failure
        message: String,
        /// Where lexing stopped
        pos: Position,
    },

    /// A custom delegate matcher reported an unrecoverable condition
    Custom {
        /// The delegate's error message
        message: String,
        /// Position at which the delegate gave up
        pos: Position,
    },

    /// A captured token could not be coerced to its field's kind
    Capture {
        /// Field the capture was bound to
        field: String,
        /// Why the coercion failed
        message: String,
        /// Position of the captured token
        pos: Position,
    },

    /// Recursion depth limit exceeded during matching
    Recursion {
        /// Depth reached
        depth: usize,
        /// Configured limit
        max_depth: usize,
    },

    /// A streaming sink rejected a parsed value
    Sink {
        /// The sink's error message
        message: String,
    },
}

impl Error {
    /// Build an unexpected-token error.
    pub fn unexpected(token: &Token, expected: impl Into<String>) -> Self {
        Error::UnexpectedToken {
            token: token.clone(),
            expected: expected.into(),
        }
    }

    /// Build a compilation error scoped to a struct (and optionally a field).
    pub fn compile(
        strct: impl Into<String>,
        field: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Error::Compile {
            strct: strct.into(),
            field: field.map(|f| f.to_string()),
            message: message.into(),
        }
    }

    /// The input position this error points at, when it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::UnexpectedToken { token, .. } => Some(token.pos),
            Error::Lex { pos, .. } | Error::Custom { pos, .. } | Error::Capture { pos, .. } => {
                Some(*pos)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile {
                strct,
                field,
                message,
            } => match field {
                Some(field) => write!(f, "{}.{}: {}", strct, field, message),
                None => write!(f, "{}: {}", strct, message),
            },
            Error::UnexpectedToken { token, expected } => {
                write!(
                    f,
                    "{}: unexpected {} (expected {})",
                    token.pos,
                    token.describe(),
                    expected
                )
            }
            Error::Lex { message, pos } => write!(f, "{}: {}", pos, message),
            Error::Custom { message, pos } => write!(f, "{}: {}", pos, message),
            Error::Capture {
                field,
                message,
                pos,
            } => write!(f, "{}: field {:?}: {}", pos, field, message),
            Error::Recursion { depth, max_depth } => {
                write!(
                    f,
                    "recursion depth {} exceeds limit of {}",
                    depth, max_depth
                )
            }
            Error::Sink { message } => write!(f, "sink error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::EOF;

    #[test]
    fn test_unexpected_token_display() {
        let tok = Token::new(0, "d", Position::new(4, 1, 5));
        let err = Error::unexpected(&tok, "\"c\"");
        let msg = err.to_string();
        assert!(msg.contains("1:5"));
        assert!(msg.contains("\"d\""));
        assert!(msg.contains("\"c\""));
    }

    #[test]
    fn test_unexpected_eof_display() {
        let tok = Token::eof(Position::new(10, 2, 3));
        let err = Error::unexpected(&tok, "<ident>");
        assert!(err.to_string().contains("end of input"));
        assert_eq!(tok.kind, EOF);
    }

    #[test]
    fn test_compile_display_names_field() {
        let err = Error::compile("Expr", Some("terms"), "empty grammar fragment");
        let msg = err.to_string();
        assert!(msg.contains("Expr"));
        assert!(msg.contains("terms"));
    }

    #[test]
    fn test_position_accessor() {
        let err = Error::Lex {
            message: "invalid character".into(),
            pos: Position::new(3, 1, 4),
        };
        assert_eq!(err.position(), Some(Position::new(3, 1, 4)));
        assert_eq!(Error::Sink { message: "closed".into() }.position(), None);
    }
}
