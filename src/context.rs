//! Per-parse mutable state.
//!
//! A [`ParseContext`] is created fresh for every top-level parse call and
//! lives exactly as long as that call; nested rule invocations share the
//! same context instance so the cursor stays globally consistent. The
//! compiled grammar carries no per-parse state, which is what makes it
//! shareable across concurrent parses.

use crate::error::Error;
use crate::token::{Token, TokenKind, TokenStream};
use hashbrown::HashSet;

/// Default recursion depth limit for rule references.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Mutable state for a single parse call.
pub struct ParseContext {
    /// Cursor over the token source; exclusively owned for the call
    pub stream: TokenStream,

    /// Disjunction lookahead budget, in tokens
    pub lookahead: usize,

    /// Token kinds whose literal matches fold case
    pub case_insensitive: HashSet<TokenKind>,

    /// Whether unconsumed trailing tokens are tolerated
    pub allow_trailing: bool,

    /// Deepest failure seen so far: (cursor position, error)
    deepest: Option<(usize, Error)>,

    /// Current rule-reference recursion depth
    depth: usize,

    /// Recursion depth limit (0 = unlimited)
    max_depth: usize,
}

impl ParseContext {
    /// Create a context over a token stream.
    pub fn new(stream: TokenStream, lookahead: usize) -> Self {
        Self {
            stream,
            lookahead,
            case_insensitive: HashSet::new(),
            allow_trailing: false,
            deepest: None,
            depth: 0,
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Set the case-insensitive kind set.
    pub fn with_case_insensitive(mut self, kinds: HashSet<TokenKind>) -> Self {
        self.case_insensitive = kinds;
        self
    }

    /// Set the recursion depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Record a failure at the current cursor position if it is at least as
    /// deep as the deepest failure recorded so far. The tracker is never
    /// reset within a parse call.
    pub fn record_failure(&mut self, error: Error) {
        let cursor = self.stream.cursor();
        match &self.deepest {
            Some((deepest, _)) if cursor < *deepest => {}
            _ => self.deepest = Some((cursor, error)),
        }
    }

    /// Pick the most informative error to surface: the recorded deepest
    /// failure when it reached at least as far as the fallback position.
    pub fn deepest_error(&self, fallback: Error) -> Error {
        match &self.deepest {
            Some((deepest, error)) if *deepest >= self.stream.cursor() => error.clone(),
            _ => fallback,
        }
    }

    /// Cursor position of the deepest recorded failure, if any.
    pub fn deepest_position(&self) -> Option<usize> {
        self.deepest.as_ref().map(|(cursor, _)| *cursor)
    }

    /// Enter a rule reference, enforcing the depth limit.
    #[inline]
    pub fn enter_rule(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.max_depth > 0 && self.depth > self.max_depth {
            return Err(Error::Recursion {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    /// Exit a rule reference.
    #[inline]
    pub fn exit_rule(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Compare a token's text against a literal, folding case when the
    /// token's kind is flagged case-insensitive. The token text itself is
    /// never altered.
    pub fn literal_matches(&self, token: &Token, text: &str) -> bool {
        if token.is_eof() {
            return false;
        }
        if self.case_insensitive.contains(&token.kind) {
            // Char-wise Unicode fold; runs per token, so no allocation.
            token
                .text
                .chars()
                .flat_map(char::to_lowercase)
                .eq(text.chars().flat_map(char::to_lowercase))
        } else {
            token.text == text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Position;

    fn ctx_with(texts: &[&str]) -> ParseContext {
        let tokens = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Token::new(0, *t, Position::new(i, 1, i + 1)))
            .collect();
        ParseContext::new(TokenStream::new(tokens), 1)
    }

    #[test]
    fn test_deepest_never_regresses() {
        let mut ctx = ctx_with(&["a", "b", "c"]);
        ctx.stream.next_token();
        ctx.stream.next_token();
        let deep = Error::unexpected(ctx.stream.peek(0), "\"x\"");
        ctx.record_failure(deep.clone());
        assert_eq!(ctx.deepest_position(), Some(2));

        // A shallower failure must not displace the recorded one.
        ctx.stream.reset(0);
        ctx.record_failure(Error::unexpected(ctx.stream.peek(0), "\"y\""));
        assert_eq!(ctx.deepest_position(), Some(2));
    }

    #[test]
    fn test_deepest_error_selection() {
        let mut ctx = ctx_with(&["a", "b"]);
        ctx.stream.next_token();
        let deep = Error::unexpected(ctx.stream.peek(0), "\"x\"");
        ctx.record_failure(deep.clone());
        ctx.stream.reset(0);
        let fallback = Error::unexpected(ctx.stream.peek(0), "\"z\"");
        // The recorded failure is deeper than the cursor, so it wins.
        assert_eq!(ctx.deepest_error(fallback.clone()), deep);
    }

    #[test]
    fn test_recursion_guard() {
        let mut ctx = ctx_with(&[]).with_max_depth(2);
        ctx.enter_rule().unwrap();
        ctx.enter_rule().unwrap();
        assert!(matches!(ctx.enter_rule(), Err(Error::Recursion { .. })));
    }

    #[test]
    fn test_case_folding_is_unicode_aware() {
        let mut ctx = ctx_with(&["CAFÉ"]);
        let tok = ctx.stream.peek(0).clone();
        ctx.case_insensitive.insert(0);
        assert!(ctx.literal_matches(&tok, "café"));
        assert!(!ctx.literal_matches(&tok, "cafe"));
    }

    #[test]
    fn test_case_folding_scoped_to_kinds() {
        let mut ctx = ctx_with(&["SELECT"]);
        let tok = ctx.stream.peek(0).clone();
        assert!(!ctx.literal_matches(&tok, "select"));
        ctx.case_insensitive.insert(0);
        assert!(ctx.literal_matches(&tok, "select"));
        // Verbatim text preserved either way.
        assert_eq!(tok.text, "SELECT");
    }
}
