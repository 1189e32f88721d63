//! Token types and the token source consumed by the matching engine.
//!
//! A [`TokenStream`] owns a fully lexed token vector and exposes the cursor
//! protocol the engine drives: bounded lookahead via [`TokenStream::peek`],
//! consumption via [`TokenStream::next_token`], and backtracking via
//! [`TokenStream::mark`] / [`TokenStream::reset`]. Restoring a mark fully
//! undoes all consumption since the mark was taken.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier for a lexical token type.
///
/// Kinds are assigned by the lexer definition; [`EOF`] is reserved for the
/// end-of-input marker.
pub type TokenKind = i32;

/// Kind of the synthesized end-of-input token.
pub const EOF: TokenKind = -1;

/// Position in source input for error reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from the start of input
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl Position {
    /// Create a position at the given offset, line and column.
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single lexed token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Lexical type identifier
    pub kind: TokenKind,
    /// Literal text of the token, verbatim from the input
    pub text: String,
    /// Source position of the first character
    pub pos: Position,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// Create the end-of-input marker at the given position.
    pub fn eof(pos: Position) -> Self {
        Self {
            kind: EOF,
            text: String::new(),
            pos,
        }
    }

    /// Whether this is the end-of-input marker.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.kind == EOF
    }

    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        if self.is_eof() {
            "end of input".to_string()
        } else {
            format!("{:?}", self.text)
        }
    }
}

/// Opaque cursor mark returned by [`TokenStream::mark`].
pub type Mark = usize;

/// A replayable source of tokens with bounded lookahead.
///
/// The stream synthesizes a single EOF token positioned just past the last
/// real token; `peek` beyond the end keeps returning it.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    eof: Token,
    cursor: usize,
}

impl TokenStream {
    /// Wrap a lexed token vector. The EOF marker is derived from the last
    /// token's position (or the input origin when the vector is empty).
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof = match tokens.last() {
            Some(last) => {
                let end = Position::new(
                    last.pos.offset + last.text.len(),
                    last.pos.line,
                    last.pos.column + last.text.chars().count(),
                );
                Token::eof(end)
            }
            None => Token::eof(Position::new(0, 1, 1)),
        };
        Self {
            tokens,
            eof,
            cursor: 0,
        }
    }

    /// Look at the token `n` positions ahead without consuming anything.
    ///
    /// Idempotent: repeated calls at the same cursor position return the
    /// same token. Past the end, the EOF marker is returned.
    #[inline]
    pub fn peek(&self, n: usize) -> &Token {
        self.tokens.get(self.cursor + n).unwrap_or(&self.eof)
    }

    /// Consume and return the next token, advancing the cursor.
    ///
    /// At end of input the EOF marker is returned and the cursor stays put.
    pub fn next_token(&mut self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(tok) => {
                let tok = tok.clone();
                self.cursor += 1;
                tok
            }
            None => self.eof.clone(),
        }
    }

    /// Capture the current cursor position for later [`reset`](Self::reset).
    #[inline]
    pub fn mark(&self) -> Mark {
        self.cursor
    }

    /// Restore a previously captured cursor position.
    #[inline]
    pub fn reset(&mut self, mark: Mark) {
        debug_assert!(mark <= self.tokens.len());
        self.cursor = mark;
    }

    /// Current cursor position, in tokens consumed.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the cursor has reached end of input.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Total number of real tokens in the stream.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the stream holds no real tokens.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
