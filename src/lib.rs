//! Grammet - Declarative Token-Stream Parsing
//!
//! Grammet builds parsers from a declarative description of the output you
//! want: a schema of named structs whose fields carry small grammar
//! fragments. The schema compiles once into an immutable node tree, which
//! then parses token streams into dynamic [`Value`] trees. It provides:
//! - A fragment mini-language: sequences, ordered alternation, optionals,
//!   repetition, negation, captures and nested struct captures
//! - Bounded-lookahead alternation with backtracking and deepest-error
//!   reporting
//! - A pluggable regex-based lexer with a sensible default
//! - Custom matchers for escaping the grammar where needed
//! - Streaming parsing that delivers each root value as it completes
//! - EBNF introspection of the compiled grammar
//!
//! ## Quick Start
//!
//! ```rust
//! use grammet::{FieldDef, Parser, Schema};
//!
//! // One struct, one rule: `Assign = <ident> "=" <number> .`
//! let schema = Schema::new().rule(
//!     "Assign",
//!     vec![
//!         FieldDef::text("name", "@Ident"),
//!         FieldDef::int("value", r#""=" @Number"#),
//!     ],
//! );
//!
//! let parser = Parser::builder(schema).build().unwrap();
//! let value = parser.parse_str("answer = 42").unwrap();
//!
//! assert_eq!(value.field("name").and_then(|v| v.as_str()), Some("answer"));
//! assert_eq!(value.field("value").and_then(|v| v.as_int()), Some(42));
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable engine trace logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]

// Prelude module for convenient imports
pub mod prelude;

mod compile;
mod engine;

pub mod context;
pub mod custom;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod token;
pub mod value;

mod ebnf;

/// Re-export commonly used types for convenience
pub use context::DEFAULT_MAX_RECURSION_DEPTH;
pub use custom::{CustomMatcher, CustomOutcome};
pub use error::Error;
pub use grammar::{Grammar, GroupMode, Node, NodeId};
pub use lexer::{default_lexer, LexerDef, RegexLexer, TokenDef};
pub use parser::{ParseOptions, Parser, ParserBuilder, ValueSink, DEFAULT_LOOKAHEAD};
pub use schema::{FieldDef, FieldKind, FieldSpec, Schema, StructDef};
pub use token::{Position, Token, TokenKind, TokenStream, EOF};
pub use value::Value;
