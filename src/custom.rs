//! Custom delegate matchers.
//!
//! A [`CustomMatcher`] substitutes user-supplied logic for a grammar
//! fragment. The delegate drives the token cursor directly and reports one
//! of three outcomes: a match (cursor advanced, values produced), "not this
//! alternative" (the delegate restores the cursor before returning), or a
//! hard error that aborts all enclosing backtracking.
//!
//! Matchers are registered by name on the parser builder and resolved to
//! table indices at compile time, so the node tree itself stays plain data.

use crate::error::Error;
use crate::token::TokenStream;
use crate::value::Value;

/// Recoverable outcome of a custom matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomOutcome {
    /// The delegate matched; the cursor sits past the consumed tokens
    Matched(Vec<Value>),
    /// Not this alternative; the delegate has restored the cursor
    NoMatch,
}

/// User-supplied matching logic for one grammar slot.
///
/// Implementations must be `Send + Sync`: the compiled parser is shared
/// across threads and delegates may be called from any of them.
pub trait CustomMatcher: Send + Sync {
    /// Attempt to match at the stream's current position.
    ///
    /// On `Ok(CustomOutcome::NoMatch)` the implementation must have
    /// restored the cursor to where it was on entry. `Err` propagates
    /// immediately, bypassing disjunction backtracking; use it when the
    /// delegate has committed past the point where trying sibling
    /// alternatives is meaningful.
    fn matches(&self, stream: &mut TokenStream) -> Result<CustomOutcome, Error>;

    /// Name used in diagnostics and introspection output.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Position, Token};

    /// Matches one token whose text is a known color word.
    struct ColorWord;

    impl CustomMatcher for ColorWord {
        fn matches(&self, stream: &mut TokenStream) -> Result<CustomOutcome, Error> {
            let mark = stream.mark();
            let tok = stream.next_token();
            if matches!(tok.text.as_str(), "red" | "green" | "blue") {
                Ok(CustomOutcome::Matched(vec![Value::Str(tok.text)]))
            } else {
                stream.reset(mark);
                Ok(CustomOutcome::NoMatch)
            }
        }

        fn name(&self) -> &str {
            "color"
        }
    }

    fn stream(texts: &[&str]) -> TokenStream {
        TokenStream::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Token::new(0, *t, Position::new(i, 1, i + 1)))
                .collect(),
        )
    }

    #[test]
    fn test_custom_match_advances() {
        let mut s = stream(&["green", "x"]);
        let out = ColorWord.matches(&mut s).unwrap();
        assert_eq!(
            out,
            CustomOutcome::Matched(vec![Value::Str("green".into())])
        );
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn test_custom_no_match_restores_cursor() {
        let mut s = stream(&["x"]);
        let out = ColorWord.matches(&mut s).unwrap();
        assert_eq!(out, CustomOutcome::NoMatch);
        assert_eq!(s.cursor(), 0);
    }
}
