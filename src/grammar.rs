//! The compiled matcher tree: an arena of nodes indexed by id.
//!
//! Nodes never own their children; every edge is a [`NodeId`] into the
//! arena. Named rules (structs) are stored exactly once, so recursion and
//! mutual recursion are plain index cycles. A [`Grammar`] is immutable
//! after compilation and safe to share across concurrent parses — all
//! mutable state lives in the per-call parse context.

use crate::schema::FieldKind;
use crate::token::TokenKind;
use serde::{Deserialize, Serialize};

/// Index of a node in the grammar arena.
pub type NodeId = usize;

/// Quantifier mode of a [`Node::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupMode {
    /// Match the group exactly once
    Once,
    /// Match zero or one time
    ZeroOrOne,
    /// Match zero or more times
    ZeroOrMore,
    /// Match one or more times
    OneOrMore,
    /// Match once, but fail if no tokens were consumed
    NonEmpty,
}

/// A matcher node. One variant per grammar construct; the engine has one
/// match arm per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Children must all match, in order
    Sequence {
        /// Indices into the node arena
        children: Vec<NodeId>,
    },

    /// Ordered alternatives; the first that matches wins
    Disjunction {
        /// Indices into the node arena
        alternatives: Vec<NodeId>,
    },

    /// Bind the child's values to a field slot of the enclosing struct
    Capture {
        /// Target field name
        field: String,
        /// Coercion applied to the produced values
        kind: FieldKind,
        /// Index into the node arena
        child: NodeId,
    },

    /// Named link to another node; carries identity, never ownership.
    /// Produced for recursive and mutually-recursive rule mentions.
    Reference {
        /// Rule name, for diagnostics and introspection
        name: String,
        /// Index of the target struct node
        target: NodeId,
    },

    /// Zero or more occurrences of the child; never fails
    Repetition {
        /// Index into the node arena
        child: NodeId,
    },

    /// Zero or one occurrence of the child; never fails
    Optional {
        /// Index into the node arena
        child: NodeId,
    },

    /// Succeeds, consuming nothing, iff the child would not match here
    Negation {
        /// Index into the node arena
        child: NodeId,
    },

    /// Child with an explicit quantifier mode
    Group {
        /// Index into the node arena
        child: NodeId,
        /// Quantifier applied to the child
        mode: GroupMode,
    },

    /// Match a token with this exact text
    Literal {
        /// Required token text
        text: String,
        /// Required token kind, when the fragment constrained it
        kind: Option<TokenKind>,
    },

    /// Match any token of a lexical type, producing its text
    TokenType {
        /// Type name as written in the fragment
        name: String,
        /// Resolved kind id
        kind: TokenKind,
    },

    /// Delegate matching to a registered custom matcher
    Custom {
        /// Index into the parser's matcher table
        id: usize,
        /// Matcher name, for diagnostics and introspection
        name: String,
    },

    /// A named composite rule owning its expression subtree
    Struct {
        /// Composite name
        name: String,
        /// Index of the rule expression
        expr: NodeId,
    },
}

/// A compiled, immutable matcher tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    /// All nodes, referenced by index
    pub nodes: Vec<Node>,
    /// Index of the root node
    pub root: NodeId,
}

impl Grammar {
    /// Create an empty grammar.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: 0,
        }
    }

    /// Append a node and return its index.
    #[inline]
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let idx = self.nodes.len();
        self.nodes.push(node);
        idx
    }

    /// Get a node by index.
    #[inline]
    pub fn get(&self, idx: NodeId) -> Option<&Node> {
        self.nodes.get(idx)
    }

    /// Total node count.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serialize to JSON, for debugging and golden tests.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut grammar = Grammar::new();
        let id = grammar.add_node(Node::Literal {
            text: "a".into(),
            kind: None,
        });
        assert_eq!(id, 0);
        assert_eq!(grammar.node_count(), 1);
        match grammar.get(id) {
            Some(Node::Literal { text, .. }) => assert_eq!(text, "a"),
            other => panic!("unexpected node {:?}", other),
        }
        assert!(grammar.get(7).is_none());
    }

    #[test]
    fn test_json_export() {
        let mut grammar = Grammar::new();
        grammar.add_node(Node::Literal {
            text: "a".into(),
            kind: None,
        });
        grammar.add_node(Node::Sequence { children: vec![0] });
        let json = grammar.to_json().unwrap();
        assert!(json.contains("Sequence"));
    }
}
