//! Declarative description of the output data model.
//!
//! A [`Schema`] registers the output structs the parser populates. Each
//! field carries a grammar fragment in the mini-language, or delegates to
//! a named custom matcher. Schemas can be built in code or deserialized
//! from JSON.
//!
//! The first registered struct is the root rule that anchors the parse.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// What a captured value is coerced to when written into a field slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Captured token texts, concatenated
    Text,
    /// A single token parsed as an integer
    Int,
    /// A single token parsed as a float
    Float,
    /// Set to `true` when the capture matches at all
    Flag,
    /// A nested composite, by struct name
    Struct(String),
    /// An ordered sequence accumulating one element per occurrence
    List(Box<FieldKind>),
}

impl FieldKind {
    /// A `Struct` kind for the named composite.
    pub fn strct(name: impl Into<String>) -> Self {
        FieldKind::Struct(name.into())
    }

    /// A `List` of the given element kind.
    pub fn list(elem: FieldKind) -> Self {
        FieldKind::List(Box::new(elem))
    }

    /// The struct name a `@@` capture on this field targets, if any.
    pub fn struct_target(&self) -> Option<&str> {
        match self {
            FieldKind::Struct(name) => Some(name),
            FieldKind::List(elem) => elem.struct_target(),
            _ => None,
        }
    }

    /// Whether captures accumulate rather than overwrite.
    pub fn is_sequence(&self) -> bool {
        matches!(self, FieldKind::List(_))
    }
}

/// The grammar half of a field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSpec {
    /// A grammar fragment in the mini-language
    Fragment(String),
    /// Delegate the whole field to the named custom matcher
    Custom(String),
}

/// One field of an output struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, the capture slot `@` binds to
    pub name: String,
    /// How captured values are stored
    pub kind: FieldKind,
    /// Grammar fragment or custom delegation
    pub spec: FieldSpec,
}

impl FieldDef {
    /// A field with an explicit kind and grammar fragment.
    pub fn new(name: impl Into<String>, kind: FieldKind, fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            spec: FieldSpec::Fragment(fragment.into()),
        }
    }

    /// A text field.
    pub fn text(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text, fragment)
    }

    /// An integer field.
    pub fn int(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int, fragment)
    }

    /// A float field.
    pub fn float(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float, fragment)
    }

    /// A boolean presence flag.
    pub fn flag(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Flag, fragment)
    }

    /// A field delegated to a registered custom matcher.
    pub fn custom(name: impl Into<String>, kind: FieldKind, matcher: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            spec: FieldSpec::Custom(matcher.into()),
        }
    }
}

/// One output struct: a named composite with grammar-annotated fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    /// Composite name, also the rule name in introspection output
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

/// The complete grammar description: a set of structs, the first being
/// the root rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Structs in registration order
    pub structs: Vec<StructDef>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a struct. The first registered struct is the root.
    pub fn rule(mut self, name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        self.structs.push(StructDef {
            name: name.into(),
            fields,
        });
        self
    }

    /// Look up a struct by name.
    pub fn get(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Name of the root struct, if any struct is registered.
    pub fn root(&self) -> Option<&str> {
        self.structs.first().map(|s| s.name.as_str())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Validate cross-references: every `Struct` field kind must name a
    /// registered struct. Called by the compiler before node construction.
    pub(crate) fn check_references(&self) -> Result<(), Error> {
        for strct in &self.structs {
            for field in &strct.fields {
                if let Some(target) = field.kind.struct_target() {
                    if self.get(target).is_none() {
                        return Err(Error::compile(
                            &strct.name,
                            Some(&field.name),
                            format!("unresolved reference to struct {:?}", target),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new()
            .rule(
                "Expr",
                vec![FieldDef::new(
                    "terms",
                    FieldKind::list(FieldKind::strct("Term")),
                    r#"@@ { "+" @@ }"#,
                )],
            )
            .rule("Term", vec![FieldDef::text("value", "@Number")])
    }

    #[test]
    fn test_first_rule_is_root() {
        let schema = sample();
        assert_eq!(schema.root(), Some("Expr"));
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = sample();
        let json = schema.to_json().unwrap();
        let parsed = Schema::from_json(&json).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_struct_target_through_list() {
        let kind = FieldKind::list(FieldKind::strct("Term"));
        assert_eq!(kind.struct_target(), Some("Term"));
        assert!(kind.is_sequence());
        assert_eq!(FieldKind::Text.struct_target(), None);
    }

    #[test]
    fn test_unresolved_reference_detected() {
        let schema = Schema::new().rule(
            "Expr",
            vec![FieldDef::new("t", FieldKind::strct("Missing"), "@@")],
        );
        let err = schema.check_references().unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }
}
