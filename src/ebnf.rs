//! EBNF rendering of a compiled grammar.
//!
//! Each struct reachable from the root becomes one production, emitted in
//! discovery order with the root first; a struct mentioned many times is
//! still named exactly once. Rule names are upper-cased on their first
//! letter, token type references render as `<lowercase>`, and quantified
//! groups carry `?`, `*`, `+` or `!` suffixes. The output is purely
//! cosmetic: rendering never mutates the grammar, so rendering twice
//! yields identical text.

use crate::grammar::{Grammar, GroupMode, Node, NodeId};
use ahash::AHashSet;
use std::collections::VecDeque;

/// Render every production reachable from the grammar root.
pub(crate) fn render(grammar: &Grammar) -> String {
    let mut renderer = Renderer {
        grammar,
        seen: AHashSet::new(),
        queue: VecDeque::new(),
    };
    renderer.mention(grammar.root);
    let mut out = String::new();
    while let Some(id) = renderer.queue.pop_front() {
        if let Some(Node::Struct { name, expr }) = grammar.get(id) {
            let body = renderer.expr(*expr, true);
            out.push_str(&format!("{} = {} .\n", upper_first(name), body));
        }
    }
    out
}

struct Renderer<'a> {
    grammar: &'a Grammar,
    seen: AHashSet<NodeId>,
    queue: VecDeque<NodeId>,
}

impl<'a> Renderer<'a> {
    /// Note a struct mention, queueing a production on first sight.
    fn mention(&mut self, id: NodeId) {
        if self.seen.insert(id) {
            self.queue.push_back(id);
        }
    }

    fn expr(&mut self, id: NodeId, root: bool) -> String {
        let node = match self.grammar.get(id) {
            Some(node) => node,
            None => return String::new(),
        };
        match node {
            Node::Struct { name, .. } => {
                self.mention(id);
                upper_first(name)
            }
            Node::Reference { name, target } => {
                self.mention(*target);
                upper_first(name)
            }
            Node::Sequence { children } => {
                let body = children
                    .iter()
                    .map(|&child| self.expr(child, false))
                    .collect::<Vec<_>>()
                    .join(" ");
                if root || children.len() == 1 {
                    body
                } else {
                    format!("({})", body)
                }
            }
            Node::Disjunction { alternatives } => {
                let body = alternatives
                    .iter()
                    .map(|&alt| self.expr(alt, false))
                    .collect::<Vec<_>>()
                    .join(" | ");
                if root {
                    body
                } else {
                    format!("({})", body)
                }
            }
            // Captures are invisible in the grammar shape.
            Node::Capture { child, .. } => self.expr(*child, root),
            Node::Optional { child } => format!("{}?", self.expr(*child, false)),
            Node::Repetition { child } => format!("{}*", self.expr(*child, false)),
            Node::Negation { child } => format!("!{}", self.expr(*child, false)),
            Node::Group { child, mode } => {
                let body = self.expr(*child, false);
                match mode {
                    GroupMode::Once => body,
                    GroupMode::ZeroOrOne => format!("{}?", body),
                    GroupMode::ZeroOrMore => format!("{}*", body),
                    GroupMode::OneOrMore => format!("{}+", body),
                    GroupMode::NonEmpty => format!("{}!", body),
                }
            }
            Node::Literal { text, .. } => format!("{:?}", text),
            Node::TokenType { name, .. } => format!("<{}>", name.to_lowercase()),
            Node::Custom { name, .. } => name.clone(),
        }
    }
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::lexer::{default_lexer, LexerDef};
    use crate::schema::{FieldDef, FieldKind, Schema};
    use ahash::AHashMap;

    fn ebnf_of(schema: &Schema) -> String {
        let symbols = default_lexer().symbols();
        let grammar = compile::compile(schema, &symbols, &AHashMap::new()).unwrap();
        render(&grammar)
    }

    #[test]
    fn test_sequence_production() {
        let schema = Schema::new().rule(
            "pair",
            vec![
                FieldDef::text("key", "@Ident"),
                FieldDef::text("value", r#""=" @Ident"#),
            ],
        );
        assert_eq!(ebnf_of(&schema), "Pair = <ident> \"=\" <ident> .\n");
    }

    #[test]
    fn test_quantifiers_and_alternation() {
        let schema = Schema::new().rule(
            "Expr",
            vec![FieldDef::text("t", r#"@Ident { ( "+" | "-" ) @Ident }"#)],
        );
        assert_eq!(
            ebnf_of(&schema),
            "Expr = <ident> ((\"+\" | \"-\") <ident>)* .\n"
        );
    }

    #[test]
    fn test_recursive_struct_named_once() {
        let schema = Schema::new().rule(
            "Tree",
            vec![
                FieldDef::text("label", "@Ident"),
                FieldDef::new("child", FieldKind::strct("Tree"), r#"[ "(" @@ ")" ]"#),
            ],
        );
        let out = ebnf_of(&schema);
        assert_eq!(out.matches("Tree =").count(), 1);
        assert_eq!(out, "Tree = <ident> (\"(\" Tree \")\")? .\n");
    }

    #[test]
    fn test_nested_struct_gets_own_production() {
        let schema = Schema::new()
            .rule(
                "Outer",
                vec![FieldDef::new(
                    "inner",
                    FieldKind::strct("Inner"),
                    r#""(" @@ ")""#,
                )],
            )
            .rule("Inner", vec![FieldDef::text("name", "@Ident")]);
        let out = ebnf_of(&schema);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Outer = "));
        assert!(lines[1].starts_with("Inner = "));
    }

    #[test]
    fn test_negation_renders_prefix_bang() {
        // Prefix negation and the suffix non-empty marker use the same
        // character without colliding.
        let schema = Schema::new().rule(
            "T",
            vec![FieldDef::text("w", r#"( "a" )! !"end" @Ident"#)],
        );
        assert_eq!(ebnf_of(&schema), "T = \"a\"! !\"end\" <ident> .\n");
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let schema = Schema::new().rule(
            "T",
            vec![FieldDef::text("x", r#"( @Ident )+ [ "," ] !"end""#)],
        );
        let symbols = default_lexer().symbols();
        let grammar = compile::compile(&schema, &symbols, &AHashMap::new()).unwrap();
        assert_eq!(render(&grammar), render(&grammar));
    }
}
