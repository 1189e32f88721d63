//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from
//! grammet. Importing this module with a wildcard import brings the core
//! types into scope:
//!
//! ```
//! use grammet::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Schema
//! - [`Schema`] - Declarative grammar description
//! - [`StructDef`] - One output struct
//! - [`FieldDef`] - One field with its grammar fragment
//! - [`FieldKind`] - How captured values are stored
//!
//! ## Parsing
//! - [`Parser`] - Compiled, shareable parser
//! - [`ParserBuilder`] - Parser configuration
//! - [`ParseOptions`] - Per-call options
//! - [`ValueSink`] - Receiver for streaming parses
//! - [`Value`] - Dynamic output value
//! - [`Error`] - All parse and compile errors
//!
//! ## Lexing
//! - [`LexerDef`] - Lexer trait
//! - [`RegexLexer`] - Regex-table lexer
//! - [`TokenDef`] - One lexer rule
//! - [`Token`], [`Position`], [`TokenStream`] - Token plumbing
//!
//! ## Extension Points
//! - [`CustomMatcher`] - User-supplied matching logic
//! - [`CustomOutcome`] - Its recoverable outcome

pub use crate::custom::{CustomMatcher, CustomOutcome};
pub use crate::error::Error;
pub use crate::lexer::{default_lexer, LexerDef, RegexLexer, TokenDef};
pub use crate::parser::{ParseOptions, Parser, ParserBuilder, ValueSink};
pub use crate::schema::{FieldDef, FieldKind, FieldSpec, Schema, StructDef};
pub use crate::token::{Position, Token, TokenKind, TokenStream};
pub use crate::value::Value;
