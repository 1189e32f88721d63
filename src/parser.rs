//! The compiled parser and its builder.
//!
//! A [`Parser`] is built once from a [`Schema`] plus options, then shared
//! freely: it holds only immutable compiled state (`Arc`ed lexer, node
//! arena, matcher table), so `&self` parse calls may run concurrently.
//!
//! ```
//! use grammet::{FieldDef, Parser, Schema};
//!
//! let schema = Schema::new().rule(
//!     "Greeting",
//!     vec![
//!         FieldDef::text("word", "@Ident"),
//!         FieldDef::text("name", r#""," @Ident "!""#),
//!     ],
//! );
//! let parser = Parser::builder(schema).build().unwrap();
//! let value = parser.parse_str("hello, world !").unwrap();
//! assert_eq!(value.field("name").and_then(|v| v.as_str()), Some("world"));
//! ```

use crate::compile;
use crate::context::{ParseContext, DEFAULT_MAX_RECURSION_DEPTH};
use crate::custom::CustomMatcher;
use crate::engine::Engine;
use crate::error::Error;
use crate::grammar::Grammar;
use crate::lexer::{default_lexer, LexerDef};
use crate::schema::Schema;
use crate::token::{Token, TokenKind, TokenStream};
use crate::value::Value;
use ahash::AHashMap;
use hashbrown::HashSet;
use std::sync::Arc;

/// Default disjunction lookahead budget, in tokens.
pub const DEFAULT_LOOKAHEAD: usize = 1;

/// Per-call parse options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Tolerate unconsumed tokens after the root match
    pub allow_trailing: bool,
}

impl ParseOptions {
    /// Options that tolerate trailing tokens.
    pub fn allow_trailing() -> Self {
        Self {
            allow_trailing: true,
        }
    }
}

/// Receiver for values produced by [`Parser::parse_stream`].
pub trait ValueSink {
    /// Accept one parsed value. An error aborts the stream and surfaces
    /// from `parse_stream` as [`Error::Sink`].
    fn push(&mut self, value: Value) -> Result<(), Error>;

    /// Called exactly once when the stream ends, whether by exhaustion or
    /// by error.
    fn close(&mut self) {}
}

impl ValueSink for Vec<Value> {
    fn push(&mut self, value: Value) -> Result<(), Error> {
        self.push(value);
        Ok(())
    }
}

/// Sends each value to a channel; a disconnected receiver aborts the
/// stream.
impl ValueSink for std::sync::mpsc::Sender<Value> {
    fn push(&mut self, value: Value) -> Result<(), Error> {
        self.send(value).map_err(|_| Error::Sink {
            message: "stream receiver disconnected".to_string(),
        })
    }
}

/// A compiled, shareable parser.
pub struct Parser {
    grammar: Grammar,
    lexer: Arc<dyn LexerDef>,
    lookahead: usize,
    case_insensitive: HashSet<TokenKind>,
    customs: Vec<Box<dyn CustomMatcher>>,
    max_depth: usize,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("grammar", &self.grammar)
            .field("lookahead", &self.lookahead)
            .field("case_insensitive", &self.case_insensitive)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Parser {
    /// Start building a parser for a schema.
    pub fn builder(schema: Schema) -> ParserBuilder {
        ParserBuilder {
            schema,
            lexer: None,
            lookahead: DEFAULT_LOOKAHEAD,
            case_insensitive: Vec::new(),
            customs: Vec::new(),
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Lex and parse a complete input string.
    pub fn parse_str(&self, input: &str) -> Result<Value, Error> {
        self.parse_str_with(input, ParseOptions::default())
    }

    /// Lex and parse an input string with explicit options.
    pub fn parse_str_with(&self, input: &str, options: ParseOptions) -> Result<Value, Error> {
        let tokens = self.lexer.lex(input)?;
        self.parse_tokens_with(tokens, options)
    }

    /// Parse an already-lexed token vector.
    pub fn parse_tokens(&self, tokens: Vec<Token>) -> Result<Value, Error> {
        self.parse_tokens_with(tokens, ParseOptions::default())
    }

    /// Parse an already-lexed token vector with explicit options.
    pub fn parse_tokens_with(
        &self,
        tokens: Vec<Token>,
        options: ParseOptions,
    ) -> Result<Value, Error> {
        let mut ctx = self.context(TokenStream::new(tokens), options);
        Engine::new(&self.grammar, &self.customs).parse_root(&mut ctx)
    }

    /// Parse a sequence of root values from one input, delivering each to
    /// the sink as soon as it completes. Returns the number of values
    /// delivered. On error, values already delivered stay delivered and
    /// the sink is still closed.
    pub fn parse_stream<S: ValueSink>(&self, input: &str, sink: &mut S) -> Result<usize, Error> {
        let result = self.stream_into(input, sink);
        sink.close();
        result
    }

    fn stream_into<S: ValueSink>(&self, input: &str, sink: &mut S) -> Result<usize, Error> {
        let tokens = self.lexer.lex(input)?;
        let mut ctx = self.context(TokenStream::new(tokens), ParseOptions::allow_trailing());
        let engine = Engine::new(&self.grammar, &self.customs);
        let mut count = 0;
        while !ctx.stream.is_eof() {
            let before = ctx.stream.cursor();
            let value = engine.parse_one(&mut ctx)?;
            if ctx.stream.cursor() == before {
                // A zero-width record would loop forever.
                let tok = ctx.stream.peek(0).clone();
                return Err(Error::unexpected(&tok, "a non-empty record"));
            }
            sink.push(value)?;
            count += 1;
        }
        Ok(count)
    }

    /// The compiled node arena, for introspection.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Render the grammar as EBNF.
    pub fn ebnf(&self) -> String {
        crate::ebnf::render(&self.grammar)
    }

    fn context(&self, stream: TokenStream, options: ParseOptions) -> ParseContext {
        let mut ctx = ParseContext::new(stream, self.lookahead)
            .with_case_insensitive(self.case_insensitive.clone())
            .with_max_depth(self.max_depth);
        ctx.allow_trailing = options.allow_trailing;
        ctx
    }
}

/// Configures and compiles a [`Parser`].
pub struct ParserBuilder {
    schema: Schema,
    lexer: Option<Arc<dyn LexerDef>>,
    lookahead: usize,
    case_insensitive: Vec<String>,
    customs: Vec<Box<dyn CustomMatcher>>,
    max_depth: usize,
}

impl ParserBuilder {
    /// Use a custom lexer instead of the default one.
    pub fn lexer(mut self, lexer: impl LexerDef + 'static) -> Self {
        self.lexer = Some(Arc::new(lexer));
        self
    }

    /// Use an already-shared lexer.
    pub fn lexer_arc(mut self, lexer: Arc<dyn LexerDef>) -> Self {
        self.lexer = Some(lexer);
        self
    }

    /// Set the disjunction lookahead budget, in tokens.
    pub fn lookahead(mut self, tokens: usize) -> Self {
        self.lookahead = tokens;
        self
    }

    /// Fold case when matching literals against tokens of the named type.
    /// Token text in the output is never altered.
    pub fn case_insensitive(mut self, token_type: impl Into<String>) -> Self {
        self.case_insensitive.push(token_type.into());
        self
    }

    /// Register a custom matcher; fragments refer to it by its
    /// [`CustomMatcher::name`].
    pub fn custom(mut self, matcher: impl CustomMatcher + 'static) -> Self {
        self.customs.push(Box::new(matcher));
        self
    }

    /// Set the rule-reference recursion depth limit (0 = unlimited).
    pub fn max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Compile the schema into a parser. Fails fast on any schema,
    /// fragment, or option error; no partially-built parser escapes.
    pub fn build(self) -> Result<Parser, Error> {
        let lexer: Arc<dyn LexerDef> = match self.lexer {
            Some(lexer) => lexer,
            None => Arc::new(default_lexer()),
        };
        let symbols = lexer.symbols();

        let mut case_insensitive = HashSet::new();
        for name in &self.case_insensitive {
            let kind = symbols.get(name).ok_or_else(|| {
                Error::compile(
                    "<options>",
                    None,
                    format!("unknown token type {:?} in case-insensitive option", name),
                )
            })?;
            case_insensitive.insert(*kind);
        }

        let mut custom_ids = AHashMap::new();
        for (idx, matcher) in self.customs.iter().enumerate() {
            let name = matcher.name().to_string();
            if custom_ids.insert(name.clone(), idx).is_some() {
                return Err(Error::compile(
                    "<options>",
                    None,
                    format!("duplicate custom matcher {:?}", name),
                ));
            }
        }

        let grammar = compile::compile(&self.schema, &symbols, &custom_ids)?;
        Ok(Parser {
            grammar,
            lexer,
            lookahead: self.lookahead,
            case_insensitive,
            customs: self.customs,
            max_depth: self.max_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::CustomOutcome;
    use crate::schema::{FieldDef, FieldKind};

    #[test]
    fn test_parse_str_roundtrip() {
        let schema = Schema::new().rule(
            "Assign",
            vec![
                FieldDef::text("name", "@Ident"),
                FieldDef::int("value", r#""=" @Number"#),
            ],
        );
        let parser = Parser::builder(schema).build().unwrap();
        let value = parser.parse_str("x = 7").unwrap();
        assert_eq!(value.field("name").and_then(Value::as_str), Some("x"));
        assert_eq!(value.field("value").and_then(Value::as_int), Some(7));
    }

    #[test]
    fn test_case_insensitive_literals() {
        let schema = Schema::new().rule(
            "Stmt",
            vec![FieldDef::text("table", r#""select" "*" "from" @Ident"#)],
        );
        let parser = Parser::builder(schema)
            .case_insensitive("Ident")
            .build()
            .unwrap();
        let value = parser.parse_str("SELECT * FROM users").unwrap();
        // Matching folds case; the captured text does not.
        assert_eq!(value.field("table").and_then(Value::as_str), Some("users"));
    }

    #[test]
    fn test_case_insensitive_unknown_type_fails_at_build() {
        let schema = Schema::new().rule("T", vec![FieldDef::text("x", "@Ident")]);
        let err = Parser::builder(schema)
            .case_insensitive("Nope")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("case-insensitive"));
    }

    #[test]
    fn test_allow_trailing() {
        let schema = Schema::new().rule("T", vec![FieldDef::text("x", "@Ident")]);
        let parser = Parser::builder(schema).build().unwrap();
        assert!(parser.parse_str("a b").is_err());
        let value = parser
            .parse_str_with("a b", ParseOptions::allow_trailing())
            .unwrap();
        assert_eq!(value.field("x").and_then(Value::as_str), Some("a"));
    }

    struct Evens;

    impl CustomMatcher for Evens {
        fn matches(&self, stream: &mut TokenStream) -> Result<CustomOutcome, Error> {
            let mark = stream.mark();
            let tok = stream.next_token();
            match tok.text.parse::<i64>() {
                Ok(n) if n % 2 == 0 => Ok(CustomOutcome::Matched(vec![Value::Str(tok.text)])),
                _ => {
                    stream.reset(mark);
                    Ok(CustomOutcome::NoMatch)
                }
            }
        }

        fn name(&self) -> &str {
            "even"
        }
    }

    #[test]
    fn test_custom_matcher_field() {
        let schema = Schema::new().rule(
            "T",
            vec![FieldDef::custom("n", FieldKind::Int, "even")],
        );
        let parser = Parser::builder(schema).custom(Evens).build().unwrap();
        let value = parser.parse_str("42").unwrap();
        assert_eq!(value.field("n").and_then(Value::as_int), Some(42));
        assert!(parser.parse_str("43").is_err());
    }

    #[test]
    fn test_duplicate_custom_matcher_rejected() {
        let schema = Schema::new().rule(
            "T",
            vec![FieldDef::custom("n", FieldKind::Int, "even")],
        );
        let err = Parser::builder(schema)
            .custom(Evens)
            .custom(Evens)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate custom matcher"));
    }

    #[test]
    fn test_stream_into_vec() {
        let schema = Schema::new().rule(
            "Record",
            vec![
                FieldDef::text("key", "@Ident"),
                FieldDef::text("value", r#""=" @Ident ";""#),
            ],
        );
        let parser = Parser::builder(schema).build().unwrap();
        let mut out: Vec<Value> = Vec::new();
        let n = parser.parse_stream("a = x ; b = y ;", &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out[1].field("key").and_then(Value::as_str), Some("b"));
    }

    #[test]
    fn test_parser_shared_across_threads() {
        let schema = Schema::new().rule("T", vec![FieldDef::text("x", "@Ident")]);
        let parser = Arc::new(Parser::builder(schema).build().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = Arc::clone(&parser);
                std::thread::spawn(move || {
                    let input = format!("word{}", i);
                    parser.parse_str(&input).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().field("x").is_some());
        }
    }
}
