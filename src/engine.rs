//! The matching engine: walks the compiled node tree against a token
//! stream.
//!
//! Captures are deferred rather than applied eagerly: evaluating a node
//! yields the values it produced plus a list of pending field bindings,
//! and the bindings are applied only when the enclosing struct node
//! succeeds. A failed alternative simply drops its bindings, so
//! backtracking never has to undo writes to the output tree.
//!
//! Failure travels as data ([`Match::NoMatch`]) and participates in
//! backtracking; `Err` is reserved for hard errors that abort the whole
//! parse: lex failures, capture coercion failures, recursion overflow, and
//! hard errors raised by custom matchers.

use crate::context::ParseContext;
use crate::custom::{CustomMatcher, CustomOutcome};
use crate::error::Error;
use crate::grammar::{Grammar, GroupMode, Node, NodeId};
use crate::schema::FieldKind;
use crate::token::Position;
use crate::value::Value;

#[cfg(feature = "logging")]
macro_rules! trace_parse {
    ($($arg:tt)*) => { log::trace!(target: "grammet::engine", $($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! trace_parse {
    ($($arg:tt)*) => {};
}

/// A pending field write, applied when the owning struct completes.
#[derive(Debug, Clone)]
struct Binding {
    field: String,
    kind: FieldKind,
    values: Vec<Value>,
    pos: Position,
}

/// Recoverable outcome of evaluating a node.
#[derive(Debug)]
enum Match {
    /// The node matched, producing values and pending bindings
    Matched {
        values: Vec<Value>,
        bindings: Vec<Binding>,
    },
    /// The node did not match; `furthest` is the deepest cursor position
    /// the attempt reached before rolling back
    NoMatch { furthest: usize },
}

impl Match {
    fn empty() -> Self {
        Match::Matched {
            values: Vec::new(),
            bindings: Vec::new(),
        }
    }
}

/// Stateless evaluator over a compiled grammar. All per-parse state lives
/// in the [`ParseContext`], so one engine serves concurrent parses.
pub(crate) struct Engine<'a> {
    grammar: &'a Grammar,
    customs: &'a [Box<dyn CustomMatcher>],
}

impl<'a> Engine<'a> {
    pub(crate) fn new(grammar: &'a Grammar, customs: &'a [Box<dyn CustomMatcher>]) -> Self {
        Self { grammar, customs }
    }

    /// Parse one value starting at the current cursor, without any
    /// end-of-input requirement. Used directly by the streaming loop.
    pub(crate) fn parse_one(&self, ctx: &mut ParseContext) -> Result<Value, Error> {
        match self.eval(self.grammar.root, ctx)? {
            Match::Matched { mut values, .. } => Ok(values.pop().unwrap_or(Value::Nil)),
            Match::NoMatch { .. } => {
                let tok = ctx.stream.peek(0).clone();
                Err(ctx.deepest_error(Error::unexpected(&tok, self.root_name())))
            }
        }
    }

    /// Parse the whole input: one value, then end of input unless the
    /// context tolerates trailing tokens.
    pub(crate) fn parse_root(&self, ctx: &mut ParseContext) -> Result<Value, Error> {
        let value = self.parse_one(ctx)?;
        if !ctx.allow_trailing && !ctx.stream.is_eof() {
            let tok = ctx.stream.peek(0).clone();
            return Err(ctx.deepest_error(Error::unexpected(&tok, "end of input")));
        }
        Ok(value)
    }

    fn root_name(&self) -> &str {
        match self.grammar.get(self.grammar.root) {
            Some(Node::Struct { name, .. }) => name,
            _ => "input",
        }
    }

    fn eval(&self, id: NodeId, ctx: &mut ParseContext) -> Result<Match, Error> {
        let node = self
            .grammar
            .get(id)
            .ok_or_else(|| Error::compile("<grammar>", None, "dangling node id"))?;
        trace_parse!("eval {:?} at {}", node, ctx.stream.cursor());

        match node {
            Node::Struct { name, expr } => match self.eval(*expr, ctx)? {
                Match::Matched { bindings, .. } => {
                    let mut value = Value::strct(name.clone());
                    for b in bindings {
                        value.bind_field(&b.field, &b.kind, b.values, b.pos)?;
                    }
                    Ok(Match::Matched {
                        values: vec![value],
                        bindings: Vec::new(),
                    })
                }
                no_match => Ok(no_match),
            },

            Node::Reference { target, .. } => {
                ctx.enter_rule()?;
                let result = self.eval(*target, ctx);
                ctx.exit_rule();
                result
            }

            Node::Sequence { children } => {
                let mark = ctx.stream.mark();
                let mut values = Vec::new();
                let mut bindings = Vec::new();
                for &child in children {
                    match self.eval(child, ctx)? {
                        Match::Matched {
                            values: v,
                            bindings: b,
                        } => {
                            values.extend(v);
                            bindings.extend(b);
                        }
                        Match::NoMatch { furthest } => {
                            ctx.stream.reset(mark);
                            return Ok(Match::NoMatch { furthest });
                        }
                    }
                }
                Ok(Match::Matched { values, bindings })
            }

            Node::Disjunction { alternatives } => self.eval_disjunction(alternatives, ctx),

            Node::Capture { field, kind, child } => {
                let pos = ctx.stream.peek(0).pos;
                let before = ctx.stream.cursor();
                match self.eval(*child, ctx)? {
                    Match::Matched {
                        values,
                        mut bindings,
                    } => {
                        // A zero-width match that produced nothing binds
                        // nothing, so @[ ... ] captures only when the
                        // optional body was actually present.
                        if !values.is_empty() || ctx.stream.cursor() != before {
                            bindings.push(Binding {
                                field: field.clone(),
                                kind: kind.clone(),
                                values: values.clone(),
                                pos,
                            });
                        }
                        Ok(Match::Matched { values, bindings })
                    }
                    no_match => Ok(no_match),
                }
            }

            Node::Optional { child } => self.eval_optional(*child, ctx),

            Node::Repetition { child } => self.eval_repeat(*child, ctx, false),

            Node::Group { child, mode } => match mode {
                GroupMode::Once => self.eval(*child, ctx),
                GroupMode::ZeroOrOne => self.eval_optional(*child, ctx),
                GroupMode::ZeroOrMore => self.eval_repeat(*child, ctx, false),
                GroupMode::OneOrMore => self.eval_repeat(*child, ctx, true),
                GroupMode::NonEmpty => {
                    let before = ctx.stream.cursor();
                    match self.eval(*child, ctx)? {
                        Match::Matched { .. } if ctx.stream.cursor() == before => {
                            let tok = ctx.stream.peek(0).clone();
                            ctx.record_failure(Error::unexpected(&tok, "a non-empty match"));
                            Ok(Match::NoMatch { furthest: before })
                        }
                        outcome => Ok(outcome),
                    }
                }
            },

            Node::Negation { child } => {
                let mark = ctx.stream.mark();
                let probed = self.eval(*child, ctx)?;
                ctx.stream.reset(mark);
                match probed {
                    Match::Matched { .. } => {
                        let tok = ctx.stream.peek(0).clone();
                        let expected = format!("anything but {}", tok.describe());
                        ctx.record_failure(Error::unexpected(&tok, &expected));
                        Ok(Match::NoMatch {
                            furthest: ctx.stream.cursor(),
                        })
                    }
                    Match::NoMatch { .. } => Ok(Match::empty()),
                }
            }

            Node::Literal { text, kind } => {
                let tok = ctx.stream.peek(0).clone();
                let kind_ok = kind.map_or(true, |k| tok.kind == k);
                if kind_ok && ctx.literal_matches(&tok, text) {
                    let tok = ctx.stream.next_token();
                    Ok(Match::Matched {
                        values: vec![Value::Str(tok.text)],
                        bindings: Vec::new(),
                    })
                } else {
                    ctx.record_failure(Error::unexpected(&tok, &format!("{:?}", text)));
                    Ok(Match::NoMatch {
                        furthest: ctx.stream.cursor(),
                    })
                }
            }

            Node::TokenType { name, kind } => {
                let tok = ctx.stream.peek(0);
                if tok.kind == *kind {
                    let tok = ctx.stream.next_token();
                    Ok(Match::Matched {
                        values: vec![Value::Str(tok.text)],
                        bindings: Vec::new(),
                    })
                } else {
                    let tok = tok.clone();
                    ctx.record_failure(Error::unexpected(&tok, name));
                    Ok(Match::NoMatch {
                        furthest: ctx.stream.cursor(),
                    })
                }
            }

            Node::Custom { id, name } => {
                let matcher = self.customs.get(*id).ok_or_else(|| Error::Custom {
                    message: format!("custom matcher table has no entry for {:?}", name),
                    pos: ctx.stream.peek(0).pos,
                })?;
                let tok = ctx.stream.peek(0).clone();
                match matcher.matches(&mut ctx.stream)? {
                    CustomOutcome::Matched(values) => Ok(Match::Matched {
                        values,
                        bindings: Vec::new(),
                    }),
                    CustomOutcome::NoMatch => {
                        ctx.record_failure(Error::unexpected(&tok, name));
                        Ok(Match::NoMatch {
                            furthest: ctx.stream.cursor(),
                        })
                    }
                }
            }
        }
    }

    /// Ordered alternation with a bounded-lookahead commit rule: once an
    /// alternative's failure reaches past `start + lookahead`, that failure
    /// is the disjunction's answer and later alternatives are not tried.
    fn eval_disjunction(
        &self,
        alternatives: &[NodeId],
        ctx: &mut ParseContext,
    ) -> Result<Match, Error> {
        let start = ctx.stream.cursor();
        let mark = ctx.stream.mark();
        let mut furthest = start;
        for &alt in alternatives {
            match self.eval(alt, ctx)? {
                matched @ Match::Matched { .. } => return Ok(matched),
                Match::NoMatch { furthest: f } => {
                    ctx.stream.reset(mark);
                    furthest = furthest.max(f);
                    if f > start + ctx.lookahead {
                        trace_parse!(
                            "disjunction committed: failure at {} exceeds budget from {}",
                            f,
                            start
                        );
                        return Ok(Match::NoMatch { furthest: f });
                    }
                }
            }
        }
        Ok(Match::NoMatch { furthest })
    }

    fn eval_optional(&self, child: NodeId, ctx: &mut ParseContext) -> Result<Match, Error> {
        let mark = ctx.stream.mark();
        match self.eval(child, ctx)? {
            matched @ Match::Matched { .. } => Ok(matched),
            Match::NoMatch { .. } => {
                ctx.stream.reset(mark);
                Ok(Match::empty())
            }
        }
    }

    /// Shared loop for `{ }`, `*` and `+`. A zero-width successful
    /// iteration counts once and terminates the loop.
    fn eval_repeat(
        &self,
        child: NodeId,
        ctx: &mut ParseContext,
        at_least_one: bool,
    ) -> Result<Match, Error> {
        let mut values = Vec::new();
        let mut bindings = Vec::new();
        let mut count = 0usize;
        loop {
            let mark = ctx.stream.mark();
            let before = ctx.stream.cursor();
            match self.eval(child, ctx)? {
                Match::Matched {
                    values: v,
                    bindings: b,
                } => {
                    values.extend(v);
                    bindings.extend(b);
                    count += 1;
                    if ctx.stream.cursor() == before {
                        break;
                    }
                }
                Match::NoMatch { furthest } => {
                    ctx.stream.reset(mark);
                    if count == 0 && at_least_one {
                        return Ok(Match::NoMatch { furthest });
                    }
                    break;
                }
            }
        }
        Ok(Match::Matched { values, bindings })
    }
}
