//! Integration tests for end-to-end parsing
//!
//! These tests exercise the whole pipeline: schema, lexer, compilation,
//! matching, capture binding, and error reporting.

use grammet::{Error, FieldDef, FieldKind, ParseOptions, Parser, Schema, Value};

// ============================================================================
// Basic Matching
// ============================================================================

#[test]
fn test_keyword_sequence() {
    let schema = Schema::new().rule(
        "Name",
        vec![FieldDef::flag("seen", r#""a" "b" "c""#)],
    );
    let parser = Parser::builder(schema).build().unwrap();
    assert!(parser.parse_str("a b c").is_ok());
}

#[test]
fn test_sequence_failure_names_position_and_expectation() {
    let schema = Schema::new().rule(
        "Name",
        vec![FieldDef::flag("seen", r#""a" "b" "c""#)],
    );
    let parser = Parser::builder(schema).build().unwrap();
    let err = parser.parse_str("a b d").unwrap_err();
    match err {
        Error::UnexpectedToken { token, expected } => {
            assert_eq!(token.text, "d");
            assert_eq!(expected, "\"c\"");
            // "a b d": the bad token starts at column 5 of line 1.
            assert_eq!(token.pos.line, 1);
            assert_eq!(token.pos.column, 5);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_prefix_alternatives_within_lookahead() {
    let schema = Schema::new().rule(
        "Term",
        vec![FieldDef::text("kw", r#"@( "if" | "ifx" )"#)],
    );
    let parser = Parser::builder(schema).lookahead(1).build().unwrap();
    let value = parser.parse_str("ifx").unwrap();
    assert_eq!(value.field("kw").and_then(Value::as_str), Some("ifx"));
    let value = parser.parse_str("if").unwrap();
    assert_eq!(value.field("kw").and_then(Value::as_str), Some("if"));
}

#[test]
fn test_repeated_group_collects_all_terms() {
    let schema = Schema::new()
        .rule(
            "Expr",
            vec![
                FieldDef::new("first", FieldKind::strct("Term"), "@@"),
                FieldDef::new(
                    "rest",
                    FieldKind::list(FieldKind::strct("Term")),
                    r#"{ "+" @@ }"#,
                ),
            ],
        )
        .rule("Term", vec![FieldDef::text("name", "@Ident")]);
    let parser = Parser::builder(schema).build().unwrap();
    let value = parser.parse_str("x + y + z").unwrap();
    assert_eq!(
        value
            .field("first")
            .and_then(|t| t.field("name"))
            .and_then(Value::as_str),
        Some("x")
    );
    let rest = value.field("rest").and_then(Value::items).unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[1].field("name").and_then(Value::as_str), Some("z"));
}

// ============================================================================
// Trailing Input
// ============================================================================

#[test]
fn test_trailing_tokens_rejected_by_default() {
    let schema = Schema::new().rule("T", vec![FieldDef::text("x", "@Ident")]);
    let parser = Parser::builder(schema).build().unwrap();
    let err = parser.parse_str("a b").unwrap_err();
    match err {
        Error::UnexpectedToken { token, .. } => assert_eq!(token.text, "b"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_trailing_tokens_tolerated_on_request() {
    let schema = Schema::new().rule("T", vec![FieldDef::text("x", "@Ident")]);
    let parser = Parser::builder(schema).build().unwrap();
    let value = parser
        .parse_str_with("a b", ParseOptions::allow_trailing())
        .unwrap();
    assert_eq!(value.field("x").and_then(Value::as_str), Some("a"));
}

// ============================================================================
// Field Kinds
// ============================================================================

#[test]
fn test_scalar_coercions() {
    let schema = Schema::new().rule(
        "Point",
        vec![
            FieldDef::int("x", "@Number"),
            FieldDef::float("y", r#""," @Number"#),
            FieldDef::flag("closed", r#"[ @"closed" ]"#),
        ],
    );
    let parser = Parser::builder(schema).build().unwrap();

    let value = parser.parse_str("3, 4.5 closed").unwrap();
    assert_eq!(value.field("x").and_then(Value::as_int), Some(3));
    assert_eq!(value.field("y").and_then(Value::as_float), Some(4.5));
    assert_eq!(value.field("closed").and_then(Value::as_bool), Some(true));

    let value = parser.parse_str("3, 4.5").unwrap();
    assert!(value.field("closed").is_none());
}

#[test]
fn test_int_coercion_failure_is_hard() {
    let schema = Schema::new().rule("T", vec![FieldDef::int("n", "@Ident")]);
    let parser = Parser::builder(schema).build().unwrap();
    let err = parser.parse_str("abc").unwrap_err();
    match err {
        Error::Capture { field, .. } => assert_eq!(field, "n"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_text_capture_concatenates() {
    let schema = Schema::new().rule(
        "Path",
        vec![FieldDef::text("path", r#"@Ident { @"." @Ident }"#)],
    );
    let parser = Parser::builder(schema).build().unwrap();
    let value = parser.parse_str("a.b.c").unwrap();
    assert_eq!(value.field("path").and_then(Value::as_str), Some("a.b.c"));
}

// ============================================================================
// Recursion
// ============================================================================

#[test]
fn test_recursive_grammar_parses_nesting() {
    let schema = Schema::new().rule(
        "Group",
        vec![
            FieldDef::text("name", "@Ident"),
            FieldDef::new("inner", FieldKind::strct("Group"), r#"[ "(" @@ ")" ]"#),
        ],
    );
    let parser = Parser::builder(schema).build().unwrap();
    let value = parser.parse_str("a ( b ( c ) )").unwrap();
    let inner = value.field("inner").unwrap();
    let innermost = inner.field("inner").unwrap();
    assert_eq!(innermost.field("name").and_then(Value::as_str), Some("c"));
    assert!(innermost.field("inner").is_none());
}

#[test]
fn test_runaway_recursion_reports_depth() {
    let schema = Schema::new().rule(
        "E",
        vec![FieldDef::new("e", FieldKind::strct("E"), r#"@@ "+""#)],
    );
    let parser = Parser::builder(schema)
        .max_recursion_depth(32)
        .build()
        .unwrap();
    let err = parser.parse_str("x + x").unwrap_err();
    assert!(matches!(err, Error::Recursion { max_depth: 32, .. }));
}

// ============================================================================
// Deepest Error Selection
// ============================================================================

#[test]
fn test_error_from_deepest_alternative() {
    // The first alternative gets three tokens in before failing; its
    // failure is the one worth reporting, not the shallow second one.
    let schema = Schema::new().rule(
        "Stmt",
        vec![FieldDef::flag(
            "m",
            r#"( "let" Ident "=" Number | "print" Ident )"#,
        )],
    );
    let parser = Parser::builder(schema).lookahead(10).build().unwrap();
    let err = parser.parse_str("let x = y").unwrap_err();
    match err {
        Error::UnexpectedToken { token, expected } => {
            assert_eq!(token.text, "y");
            assert_eq!(expected, "Number");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_commit_past_lookahead_stops_backtracking() {
    let schema = Schema::new().rule(
        "T",
        vec![FieldDef::flag("m", r#"( "a" "b" "c" | "a" "b" "d" )"#)],
    );

    // Budget 0: the first alternative's two consumed tokens commit it.
    let strict = Parser::builder(schema.clone()).lookahead(0).build().unwrap();
    assert!(strict.parse_str("a b d").is_err());

    // Budget 2 covers the divergence point, so the second alternative runs.
    let lenient = Parser::builder(schema).lookahead(2).build().unwrap();
    assert!(lenient.parse_str("a b d").is_ok());
}

// ============================================================================
// Schema Validation
// ============================================================================

#[test]
fn test_unresolved_struct_reference_fails_at_build() {
    let schema = Schema::new().rule(
        "T",
        vec![FieldDef::new("x", FieldKind::strct("Ghost"), "@@")],
    );
    let err = Parser::builder(schema).build().unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
    assert!(err.to_string().contains("Ghost"));
}

#[test]
fn test_empty_schema_fails_at_build() {
    let err = Parser::builder(Schema::new()).build().unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
}

#[test]
fn test_schema_json_roundtrip_builds_equal_parser() {
    let schema = Schema::new().rule(
        "Assign",
        vec![
            FieldDef::text("name", "@Ident"),
            FieldDef::int("value", r#""=" @Number"#),
        ],
    );
    let json = schema.to_json().unwrap();
    let restored = Schema::from_json(&json).unwrap();
    assert_eq!(schema, restored);

    let parser = Parser::builder(restored).build().unwrap();
    let value = parser.parse_str("n = 9").unwrap();
    assert_eq!(value.field("value").and_then(Value::as_int), Some(9));
}
