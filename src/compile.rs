//! Grammar compiler: schema plus fragment mini-language in, node arena out.
//!
//! Each struct's field fragments are scanned as one combined token stream
//! (so an alternation may span adjacent fields) and parsed by recursive
//! descent into arena nodes. Struct compilation is memoized by name: when
//! a struct mentions one that is already being compiled — itself, or a
//! mutual-recursion partner — the mention becomes a [`Node::Reference`] to
//! the reserved arena slot instead of descending again.
//!
//! The fragment mini-language:
//!
//! ```text
//! disjunction = sequence { "|" sequence }
//! sequence    = term { term }
//! term        = "@" "@"              (capture nested struct)
//!             | "@" term             (capture)
//!             | "!" term             (negation)
//!             | "(" disjunction ")"  (group; mode suffix ? * + ! applies)
//!             | "[" disjunction "]"  (optional)
//!             | "{" disjunction "}"  (repetition)
//!             | "lit" [":" Type]     (literal, optionally type-constrained)
//!             | Type                 (token type reference)
//! ```
//!
//! Compilation fails fast: no partial grammar is ever observable.

use crate::error::Error;
use crate::grammar::{Grammar, GroupMode, Node, NodeId};
use crate::schema::{FieldSpec, Schema, StructDef};
use crate::token::TokenKind;
use ahash::AHashMap;
use hashbrown::HashMap;

/// One scanned fragment token, tagged with the field it came from.
#[derive(Debug, Clone, PartialEq)]
enum FragTok {
    Ident(String),
    Literal(String),
    Punct(char),
    /// Whole-field delegation to a named custom matcher
    Custom(String),
}

struct FragStream {
    toks: Vec<(FragTok, usize)>,
    pos: usize,
}

impl FragStream {
    fn peek(&self) -> Option<&FragTok> {
        self.toks.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(FragTok, usize)> {
        let item = self.toks.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    /// Field index of the token about to be consumed (or the last one).
    fn field(&self) -> usize {
        self.toks
            .get(self.pos.min(self.toks.len().saturating_sub(1)))
            .map(|(_, f)| *f)
            .unwrap_or(0)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }
}

pub(crate) struct Compiler<'a> {
    schema: &'a Schema,
    symbols: &'a HashMap<String, TokenKind>,
    customs: &'a AHashMap<String, usize>,
    grammar: Grammar,
    memo: AHashMap<String, NodeId>,
}

/// Compile a schema into a grammar, resolving token type names against the
/// lexer's symbol table and custom matcher names against the registration
/// table.
pub(crate) fn compile(
    schema: &Schema,
    symbols: &HashMap<String, TokenKind>,
    customs: &AHashMap<String, usize>,
) -> Result<Grammar, Error> {
    schema.check_references()?;
    let root = schema
        .root()
        .ok_or_else(|| Error::compile("<schema>", None, "schema declares no structs"))?
        .to_string();
    let mut compiler = Compiler {
        schema,
        symbols,
        customs,
        grammar: Grammar::new(),
        memo: AHashMap::new(),
    };
    let root_id = compiler.compile_struct(&root)?;
    compiler.grammar.root = root_id;
    Ok(compiler.grammar)
}

impl<'a> Compiler<'a> {
    /// A mention of a struct in expression position. The first mention
    /// compiles the struct; later mentions (including recursive ones while
    /// it is still under construction) become references to its slot.
    fn struct_ref(&mut self, name: &str) -> Result<NodeId, Error> {
        if let Some(&target) = self.memo.get(name) {
            return Ok(self.grammar.add_node(Node::Reference {
                name: name.to_string(),
                target,
            }));
        }
        self.compile_struct(name)
    }

    fn compile_struct(&mut self, name: &str) -> Result<NodeId, Error> {
        let def = self
            .schema
            .get(name)
            .ok_or_else(|| Error::compile(name, None, "unresolved struct reference"))?;
        if def.fields.is_empty() {
            return Err(Error::compile(name, None, "struct declares no fields"));
        }

        // Reserve the slot before compiling fields so recursive mentions
        // resolve to it.
        let id = self.grammar.add_node(Node::Struct {
            name: name.to_string(),
            expr: usize::MAX,
        });
        self.memo.insert(name.to_string(), id);

        let mut fs = self.scan_fields(def)?;
        let expr = self.parse_disjunction(&mut fs, def)?;
        if !fs.at_end() {
            let field = &def.fields[fs.field()].name;
            return Err(Error::compile(
                name,
                Some(field),
                "malformed grammar fragment: trailing input",
            ));
        }

        self.grammar.nodes[id] = Node::Struct {
            name: name.to_string(),
            expr,
        };
        Ok(id)
    }

    /// Scan every field's fragment into one combined token stream.
    fn scan_fields(&self, def: &StructDef) -> Result<FragStream, Error> {
        let mut toks = Vec::new();
        for (idx, field) in def.fields.iter().enumerate() {
            match &field.spec {
                FieldSpec::Custom(matcher) => {
                    toks.push((FragTok::Custom(matcher.clone()), idx));
                }
                FieldSpec::Fragment(fragment) => {
                    let before = toks.len();
                    scan_fragment(fragment, idx, &mut toks).map_err(|message| {
                        Error::compile(&def.name, Some(&field.name), message)
                    })?;
                    if toks.len() == before {
                        return Err(Error::compile(
                            &def.name,
                            Some(&field.name),
                            "empty grammar fragment",
                        ));
                    }
                }
            }
        }
        Ok(FragStream { toks, pos: 0 })
    }

    fn parse_disjunction(&mut self, fs: &mut FragStream, def: &StructDef) -> Result<NodeId, Error> {
        let mut alternatives = vec![self.parse_sequence(fs, def)?];
        while fs.peek() == Some(&FragTok::Punct('|')) {
            fs.next();
            alternatives.push(self.parse_sequence(fs, def)?);
        }
        if alternatives.len() == 1 {
            Ok(alternatives[0])
        } else {
            Ok(self.grammar.add_node(Node::Disjunction { alternatives }))
        }
    }

    fn parse_sequence(&mut self, fs: &mut FragStream, def: &StructDef) -> Result<NodeId, Error> {
        let mut children = Vec::new();
        loop {
            match fs.peek() {
                None
                | Some(FragTok::Punct('|'))
                | Some(FragTok::Punct(')'))
                | Some(FragTok::Punct(']'))
                | Some(FragTok::Punct('}')) => break,
                _ => children.push(self.parse_term(fs, def)?),
            }
        }
        if children.is_empty() {
            let field = &def.fields[fs.field()].name;
            return Err(Error::compile(
                &def.name,
                Some(field),
                "empty alternative in grammar fragment",
            ));
        }
        if children.len() == 1 {
            Ok(children[0])
        } else {
            Ok(self.grammar.add_node(Node::Sequence { children }))
        }
    }

    fn parse_term(&mut self, fs: &mut FragStream, def: &StructDef) -> Result<NodeId, Error> {
        let field_idx = fs.field();
        let field = &def.fields[field_idx];
        let err = |message: String| Error::compile(&def.name, Some(&field.name), message);

        let (tok, _) = fs
            .next()
            .ok_or_else(|| err("unexpected end of grammar fragment".into()))?;

        let node = match tok {
            FragTok::Punct('@') => {
                let child = if fs.peek() == Some(&FragTok::Punct('@')) {
                    fs.next();
                    let target = field.kind.struct_target().ok_or_else(|| {
                        err("@@ capture on a field without a struct target".into())
                    })?;
                    self.struct_ref(&target.to_string())?
                } else {
                    self.parse_term(fs, def)?
                };
                self.grammar.add_node(Node::Capture {
                    field: field.name.clone(),
                    kind: field.kind.clone(),
                    child,
                })
            }
            FragTok::Punct('!') => {
                let child = self.parse_term(fs, def)?;
                self.grammar.add_node(Node::Negation { child })
            }
            FragTok::Punct('(') => {
                let child = self.parse_disjunction(fs, def)?;
                self.expect(fs, ')', def)?;
                self.grammar.add_node(Node::Group {
                    child,
                    mode: GroupMode::Once,
                })
            }
            FragTok::Punct('[') => {
                let child = self.parse_disjunction(fs, def)?;
                self.expect(fs, ']', def)?;
                self.grammar.add_node(Node::Optional { child })
            }
            FragTok::Punct('{') => {
                let child = self.parse_disjunction(fs, def)?;
                self.expect(fs, '}', def)?;
                self.grammar.add_node(Node::Repetition { child })
            }
            FragTok::Literal(text) => {
                let kind = if fs.peek() == Some(&FragTok::Punct(':')) {
                    fs.next();
                    match fs.next() {
                        Some((FragTok::Ident(name), _)) => Some(self.resolve_symbol(&name, &err)?),
                        _ => return Err(err("expected token type after ':'".into())),
                    }
                } else {
                    None
                };
                self.grammar.add_node(Node::Literal { text, kind })
            }
            FragTok::Ident(name) => {
                let kind = self.resolve_symbol(&name, &err)?;
                self.grammar.add_node(Node::TokenType { name, kind })
            }
            FragTok::Custom(name) => {
                let id = *self
                    .customs
                    .get(&name)
                    .ok_or_else(|| err(format!("unregistered custom matcher {:?}", name)))?;
                let custom = self.grammar.add_node(Node::Custom { id, name });
                self.grammar.add_node(Node::Capture {
                    field: field.name.clone(),
                    kind: field.kind.clone(),
                    child: custom,
                })
            }
            FragTok::Punct(ch) => {
                return Err(err(format!(
                    "unexpected {:?} in grammar fragment",
                    ch
                )))
            }
        };

        Ok(self.apply_suffix(fs, node))
    }

    /// Wrap a term in a group when a quantifier suffix follows it.
    fn apply_suffix(&mut self, fs: &mut FragStream, child: NodeId) -> NodeId {
        let mode = match fs.peek() {
            Some(FragTok::Punct('?')) => GroupMode::ZeroOrOne,
            Some(FragTok::Punct('*')) => GroupMode::ZeroOrMore,
            Some(FragTok::Punct('+')) => GroupMode::OneOrMore,
            Some(FragTok::Punct('!')) => GroupMode::NonEmpty,
            _ => return child,
        };
        fs.next();
        self.grammar.add_node(Node::Group { child, mode })
    }

    fn expect(&self, fs: &mut FragStream, close: char, def: &StructDef) -> Result<(), Error> {
        let field = &def.fields[fs.field()].name;
        match fs.next() {
            Some((FragTok::Punct(ch), _)) if ch == close => Ok(()),
            _ => Err(Error::compile(
                &def.name,
                Some(field),
                format!("expected {:?} in grammar fragment", close),
            )),
        }
    }

    fn resolve_symbol(
        &self,
        name: &str,
        err: &dyn Fn(String) -> Error,
    ) -> Result<TokenKind, Error> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| err(format!("unknown token type {:?}", name)))
    }
}

/// Scan a single field's fragment text.
fn scan_fragment(
    fragment: &str,
    field_idx: usize,
    out: &mut Vec<(FragTok, usize)>,
) -> Result<(), String> {
    let mut chars = fragment.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(c) => text.push(c),
                            None => return Err("unterminated string literal".into()),
                        },
                        Some(c) => text.push(c),
                        None => return Err("unterminated string literal".into()),
                    }
                }
                out.push((FragTok::Literal(text), field_idx));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push((FragTok::Ident(ident), field_idx));
            }
            '@' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '?' | '*' | '+' | '!' | ':' => {
                chars.next();
                out.push((FragTok::Punct(ch), field_idx));
            }
            other => return Err(format!("unexpected {:?} in grammar fragment", other)),
        }
    }
    Ok(())
}
