//! Regex-driven tokenizer used when no custom lexer is supplied.
//!
//! A lexer is described by an ordered list of [`TokenDef`]s. At each input
//! position every non-anchored pattern is tried and the longest match wins,
//! earlier definitions breaking ties. Definitions flagged `ignore` consume
//! input without producing tokens (whitespace, comments).
//!
//! Any type implementing [`LexerDef`] can replace the default; the engine
//! only relies on the symbol table and the produced token vector.

use crate::error::Error;
use crate::token::{Position, Token, TokenKind};
use hashbrown::HashMap;
use memchr::memchr_iter;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A lexer definition: names the lexical types and turns input into tokens.
pub trait LexerDef: Send + Sync {
    /// Map of token type names to their kind ids.
    fn symbols(&self) -> HashMap<String, TokenKind>;

    /// Tokenize the whole input. Tokenization failures are [`Error::Lex`].
    fn lex(&self, input: &str) -> Result<Vec<Token>, Error>;
}

/// One token definition for [`RegexLexer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDef {
    /// Token type name (e.g. "Ident", "Number")
    pub name: String,
    /// Regex pattern matched at the current position
    pub pattern: String,
    /// Whether matches are dropped instead of emitted (whitespace, comments)
    #[serde(default)]
    pub ignore: bool,
}

impl TokenDef {
    /// Create an emitting token definition.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            ignore: false,
        }
    }

    /// Create an ignored (skipped) token definition.
    pub fn ignored(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            ignore: true,
        }
    }
}

struct CompiledDef {
    kind: TokenKind,
    regex: Regex,
    ignore: bool,
}

/// Regex-based lexer built from an ordered list of [`TokenDef`]s.
pub struct RegexLexer {
    defs: Vec<CompiledDef>,
    symbols: HashMap<String, TokenKind>,
}

impl RegexLexer {
    /// Compile the definitions. Kind ids are assigned in definition order;
    /// ignored definitions receive ids too but never appear in the output.
    pub fn new(defs: Vec<TokenDef>) -> Result<Self, Error> {
        let mut compiled = Vec::with_capacity(defs.len());
        let mut symbols = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            let kind = i as TokenKind;
            let regex = Regex::new(&def.pattern).map_err(|e| Error::Lex {
                message: format!("invalid token pattern {:?}: {}", def.pattern, e),
                pos: Position::new(0, 1, 1),
            })?;
            compiled.push(CompiledDef {
                kind,
                regex,
                ignore: def.ignore,
            });
            if !def.ignore {
                symbols.insert(def.name.clone(), kind);
            }
        }
        Ok(Self {
            defs: compiled,
            symbols,
        })
    }
}

impl LexerDef for RegexLexer {
    fn symbols(&self) -> HashMap<String, TokenKind> {
        self.symbols.clone()
    }

    fn lex(&self, input: &str) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        let mut line = 1;
        let mut column = 1;

        while offset < input.len() {
            let rest = &input[offset..];
            let mut best: Option<(&CompiledDef, usize)> = None;
            for def in &self.defs {
                if let Some(m) = def.regex.find(rest) {
                    if m.start() != 0 || m.end() == 0 {
                        continue;
                    }
                    // Longest match wins; earlier def breaks the tie.
                    if best.map_or(true, |(_, len)| m.end() > len) {
                        best = Some((def, m.end()));
                    }
                }
            }

            let (def, len) = match best {
                Some(hit) => hit,
                None => {
                    let ch = rest.chars().next().unwrap_or('\u{fffd}');
                    return Err(Error::Lex {
                        message: format!("invalid character {:?}", ch),
                        pos: Position::new(offset, line, column),
                    });
                }
            };

            let text = &rest[..len];
            if !def.ignore {
                tokens.push(Token::new(
                    def.kind,
                    text,
                    Position::new(offset, line, column),
                ));
            }

            let newlines = memchr_iter(b'\n', text.as_bytes()).count();
            if newlines > 0 {
                line += newlines;
                let last_nl = text.rfind('\n').unwrap_or(0);
                column = text[last_nl + 1..].chars().count() + 1;
            } else {
                column += text.chars().count();
            }
            offset += len;
        }

        Ok(tokens)
    }
}

/// The built-in lexer: identifiers, numbers, double-quoted strings,
/// single-character punctuation, with whitespace skipped.
pub fn default_lexer() -> RegexLexer {
    RegexLexer::new(vec![
        TokenDef::ignored("whitespace", r"[ \t\r\n]+"),
        TokenDef::new("Ident", r"[A-Za-z_][A-Za-z0-9_]*"),
        TokenDef::new("Number", r"[0-9]+(\.[0-9]+)?"),
        TokenDef::new("String", r#""([^"\\]|\\.)*""#),
        TokenDef::new("Punct", r"[^ \t\r\nA-Za-z0-9_]"),
    ])
    .expect("default lexer patterns are valid")
}
