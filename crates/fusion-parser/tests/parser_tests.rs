//! Parser tests: value literals, object paths, confinement blocks,
//! comments, operators and prototype-chain linearization.

use fusion_parser::{DslRegistry, DslTranspiler, Parser};
use fusion_types::{FusionError, FusionNode, FusionResult, TreeValue};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Parse source into a tree, panicking on errors.
fn parse(source: &str) -> FusionNode {
    match Parser::new(source).parse() {
        Ok(tree) => tree,
        Err(error) => panic!("unexpected parse error: {error}"),
    }
}

/// Parse source and return the error.
fn parse_err(source: &str) -> FusionError {
    Parser::new(source)
        .parse()
        .expect_err("source should fail to parse")
}

fn value_at(tree: &FusionNode, path: &[&str]) -> TreeValue {
    tree.node(path)
        .value
        .clone()
        .unwrap_or_else(|| panic!("no value at {path:?}"))
}

// ─────────────────────────────────────────────────────────────────────
// Value literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn integer_literal() {
    let tree = parse("x = 42\n");
    assert_eq!(value_at(&tree, &["x"]), TreeValue::Int(42));
    let tree = parse("x = -7\n");
    assert_eq!(value_at(&tree, &["x"]), TreeValue::Int(-7));
}

#[test]
fn float_literal() {
    let tree = parse("x = 4.5\n");
    assert_eq!(value_at(&tree, &["x"]), TreeValue::Float(4.5));
    let tree = parse("x = -0.25\n");
    assert_eq!(value_at(&tree, &["x"]), TreeValue::Float(-0.25));
}

#[test]
fn quoted_string_literals_unescape() {
    let tree = parse(r#"x = 'it\'s'"#);
    assert_eq!(value_at(&tree, &["x"]), TreeValue::String("it's".into()));
    let tree = parse(r#"x = "say \"hi\"""#);
    assert_eq!(
        value_at(&tree, &["x"]),
        TreeValue::String(r#"say "hi""#.into())
    );
}

#[test]
fn boolean_literals_are_case_insensitive() {
    let tree = parse("a = TRUE\nb = false\nc = True\n");
    assert_eq!(value_at(&tree, &["a"]), TreeValue::Bool(true));
    assert_eq!(value_at(&tree, &["b"]), TreeValue::Bool(false));
    assert_eq!(value_at(&tree, &["c"]), TreeValue::Bool(true));
}

#[test]
fn null_literal_is_an_explicit_marker() {
    let tree = parse("x = null\ny = NULL\n");
    assert_eq!(value_at(&tree, &["x"]), TreeValue::Null);
    assert_eq!(value_at(&tree, &["y"]), TreeValue::Null);
    // distinguishable from a path that was never configured
    assert!(tree.get(&["z"]).is_none());
}

#[test]
fn object_type_reference_gets_the_default_namespace() {
    let tree = parse("x = Value\n");
    assert_eq!(tree.child("x").object_type, "Neos.Fusion:Value");
    assert!(tree.child("x").value.is_none());
}

#[test]
fn object_type_reference_keeps_an_explicit_namespace() {
    let tree = parse("x = Test:Button\n");
    assert_eq!(tree.child("x").object_type, "Test:Button");
}

#[test]
fn unrecognized_tokens_fall_back_to_strings() {
    let tree = parse("x = some bare text\n");
    assert_eq!(
        value_at(&tree, &["x"]),
        TreeValue::String("some bare text".into())
    );
}

#[test]
fn multi_line_string_literal() {
    let tree = parse("x = \"line one\nline two\"\ny = 1\n");
    assert_eq!(
        value_at(&tree, &["x"]),
        TreeValue::String("line one\nline two".into())
    );
    // the continuation did not swallow the following line
    assert_eq!(value_at(&tree, &["y"]), TreeValue::Int(1));
}

#[test]
fn unterminated_string_literal_is_a_syntax_error() {
    let error = parse_err("x = \"never closed\n");
    assert!(matches!(error, FusionError::Syntax { .. }));
}

#[test]
fn expression_literal_single_line() {
    let tree = parse("x = ${foo.bar}\n");
    assert_eq!(tree.child("x").expression, "${foo.bar}");
    assert!(tree.child("x").value.is_none());
}

#[test]
fn expression_literal_spans_lines_until_a_closing_brace() {
    let tree = parse("x = ${foo ||\n  bar}\ny = 2\n");
    assert_eq!(tree.child("x").expression, "${foo ||  bar}");
    assert_eq!(value_at(&tree, &["y"]), TreeValue::Int(2));
}

#[test]
fn unterminated_expression_is_a_syntax_error() {
    let error = parse_err("x = ${foo\n");
    assert!(matches!(error, FusionError::Syntax { .. }));
}

// ─────────────────────────────────────────────────────────────────────
// Paths and confinement blocks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn dotted_paths_nest() {
    let tree = parse("a.b.c = 1\n");
    assert_eq!(value_at(&tree, &["a", "b", "c"]), TreeValue::Int(1));
}

#[test]
fn confinement_blocks_prefix_their_content() {
    let tree = parse("a {\n  b = 1\n  c.d = 2\n}\n");
    assert_eq!(value_at(&tree, &["a", "b"]), TreeValue::Int(1));
    assert_eq!(value_at(&tree, &["a", "c", "d"]), TreeValue::Int(2));
}

#[test]
fn blocks_nest() {
    let tree = parse("a {\n  b {\n    c = 1\n  }\n}\n");
    assert_eq!(value_at(&tree, &["a", "b", "c"]), TreeValue::Int(1));
}

#[test]
fn assignment_with_trailing_brace_opens_a_block() {
    let tree = parse("a = Test:Thing {\n  b = 1\n}\n");
    assert_eq!(tree.child("a").object_type, "Test:Thing");
    assert_eq!(value_at(&tree, &["a", "b"]), TreeValue::Int(1));
}

#[test]
fn relative_paths_resolve_against_the_open_block() {
    let tree = parse("a {\n  .b = 1\n}\n");
    assert_eq!(value_at(&tree, &["a", "b"]), TreeValue::Int(1));
}

#[test]
fn meta_sugar_expands_to_meta_children() {
    let tree = parse("a.@process.trim = 1\n");
    assert_eq!(
        value_at(&tree, &["a", "__meta", "process", "trim"]),
        TreeValue::Int(1)
    );
}

#[test]
fn quoted_path_segments_keep_special_characters() {
    let tree = parse("\"with.dot\".x = 1\n");
    assert_eq!(value_at(&tree, &["with.dot", "x"]), TreeValue::Int(1));
}

#[test]
fn extra_closing_confinement_is_a_syntax_error() {
    let error = parse_err("a = 1\n}\n");
    match error {
        FusionError::Syntax { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains("closing confinement"));
        }
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn open_blocks_close_implicitly_at_end_of_input() {
    let tree = parse("a {\n  b = 1\n");
    assert_eq!(value_at(&tree, &["a", "b"]), TreeValue::Int(1));
}

#[test]
fn garbage_lines_report_their_line_number() {
    let error = parse_err("a = 1\n???\n");
    match error {
        FusionError::Syntax { line, .. } => assert_eq!(line, 2),
        other => panic!("expected a syntax error, got {other}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Comments
// ─────────────────────────────────────────────────────────────────────

#[test]
fn line_comments_are_skipped() {
    let tree = parse("# comment\n// another\na = 1\n");
    assert_eq!(value_at(&tree, &["a"]), TreeValue::Int(1));
}

#[test]
fn block_comments_span_lines() {
    let tree = parse("/* first\nsecond\nthird */\na = 1\n");
    assert_eq!(value_at(&tree, &["a"]), TreeValue::Int(1));
    assert!(tree.get(&["second"]).is_none());
}

#[test]
fn content_after_a_block_comment_close_is_parsed() {
    let tree = parse("/* note */ a = 1\n");
    assert_eq!(value_at(&tree, &["a"]), TreeValue::Int(1));
    let tree = parse("/* spans\nlines */ b = 2\n");
    assert_eq!(value_at(&tree, &["b"]), TreeValue::Int(2));
}

// ─────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn unset_operator_removes_the_subtree() {
    let tree = parse("a.b = 1\na.c = 2\na.b >\n");
    assert!(tree.get(&["a", "b"]).is_none());
    assert_eq!(value_at(&tree, &["a", "c"]), TreeValue::Int(2));
}

#[test]
fn copy_operator_clones_the_source_subtree() {
    let tree = parse("a.b = 'orig'\nc < a\na.b = 'changed'\n");
    assert_eq!(
        value_at(&tree, &["c", "b"]),
        TreeValue::String("orig".into())
    );
    assert_eq!(
        value_at(&tree, &["a", "b"]),
        TreeValue::String("changed".into())
    );
}

#[test]
fn copying_a_missing_source_unsets_the_target() {
    let tree = parse("a = 1\na < ghost\n");
    assert!(tree.get(&["a"]).is_none());
}

#[test]
fn copy_sources_are_absolute_inside_blocks_unless_dotted() {
    let tree = parse("top = 'global'\na {\n  b = 'local'\n  c < top\n  d < .b\n}\n");
    assert_eq!(
        value_at(&tree, &["a", "c"]),
        TreeValue::String("global".into())
    );
    assert_eq!(
        value_at(&tree, &["a", "d"]),
        TreeValue::String("local".into())
    );
}

// ─────────────────────────────────────────────────────────────────────
// Prototypes
// ─────────────────────────────────────────────────────────────────────

#[test]
fn prototype_sugar_expands() {
    let tree = parse("prototype(Test:Button).tagName = 'button'\n");
    assert_eq!(
        value_at(&tree, &["__prototypes", "Test:Button", "tagName"]),
        TreeValue::String("button".into())
    );
}

#[test]
fn prototype_inheritance_records_the_parent_name() {
    let tree = parse("prototype(Test:B) < prototype(Test:A)\n");
    assert_eq!(
        value_at(&tree, &["__prototypes", "Test:B", "__prototypeObjectName"]),
        TreeValue::String("Test:A".into())
    );
}

#[test]
fn prototype_chains_linearize_furthest_ancestor_first() {
    let tree = parse(
        "prototype(Test:C) < prototype(Test:B)\nprototype(Test:B) < prototype(Test:A)\n\
         prototype(Test:A).x = 1\n",
    );
    assert_eq!(
        value_at(&tree, &["__prototypes", "Test:C", "__prototypeChain"]),
        TreeValue::Strings(vec!["Test:A".into(), "Test:B".into()])
    );
    assert_eq!(
        value_at(&tree, &["__prototypes", "Test:B", "__prototypeChain"]),
        TreeValue::Strings(vec!["Test:A".into()])
    );
}

#[test]
fn recursive_inheritance_is_detected() {
    let error = parse_err(
        "prototype(Test:X) < prototype(Test:Y)\nprototype(Test:Y) < prototype(Test:X)\n",
    );
    match error {
        FusionError::Configuration(message) => {
            assert!(message.contains("recursive inheritance"));
            assert!(message.contains(" < "));
        }
        other => panic!("expected a configuration error, got {other}"),
    }
}

#[test]
fn self_inheritance_is_detected() {
    let error = parse_err("prototype(Test:X) < prototype(Test:X)\n");
    assert!(matches!(error, FusionError::Configuration(_)));
}

#[test]
fn inheritance_with_only_one_prototype_side_is_rejected() {
    let error = parse_err("a < prototype(Test:A)\n");
    assert!(matches!(error, FusionError::Configuration(_)));
    let error = parse_err("prototype(Test:A) < a\n");
    assert!(matches!(error, FusionError::Configuration(_)));
}

#[test]
fn nested_prototype_inheritance_is_rejected() {
    let error = parse_err("foo.prototype(Test:B) < prototype(Test:A)\n");
    match error {
        FusionError::Configuration(message) => assert!(message.contains("top level")),
        other => panic!("expected a configuration error, got {other}"),
    }
}

#[test]
fn prototype_bodies_parse_inside_inheritance_declarations() {
    let tree = parse("prototype(Test:B) < prototype(Test:A) {\n  x = 1\n}\n");
    assert_eq!(
        value_at(&tree, &["__prototypes", "Test:B", "x"]),
        TreeValue::Int(1)
    );
}

// ─────────────────────────────────────────────────────────────────────
// DSL literals
// ─────────────────────────────────────────────────────────────────────

struct ShoutingDsl;

impl DslTranspiler for ShoutingDsl {
    fn transpile(&self, code: &str) -> FusionResult<String> {
        Ok(format!("'{}'", code.to_uppercase()))
    }
}

fn registry() -> DslRegistry {
    let mut registry = DslRegistry::new();
    registry.register("shout", Box::new(ShoutingDsl));
    registry
}

#[test]
fn dsl_literal_transpiles_through_the_registry() {
    let registry = registry();
    let tree = Parser::new("x = shout`hello`\n")
        .with_dsl_registry(&registry)
        .parse()
        .unwrap();
    assert_eq!(value_at(&tree, &["x"]), TreeValue::String("HELLO".into()));
}

#[test]
fn dsl_literal_spans_lines_until_the_closing_backtick() {
    let registry = registry();
    let tree = Parser::new("x = shout`first\nsecond`\ny = 1\n")
        .with_dsl_registry(&registry)
        .parse()
        .unwrap();
    assert_eq!(
        value_at(&tree, &["x"]),
        TreeValue::String("FIRST\nSECOND".into())
    );
    assert_eq!(value_at(&tree, &["y"]), TreeValue::Int(1));
}

#[test]
fn unknown_dsl_identifier_is_an_error() {
    let registry = registry();
    let error = Parser::new("x = mystery`code`\n")
        .with_dsl_registry(&registry)
        .parse()
        .unwrap_err();
    match error {
        FusionError::Dsl(message) => assert!(message.contains("mystery")),
        other => panic!("expected a dsl error, got {other}"),
    }
}

#[test]
fn unterminated_dsl_literal_is_a_syntax_error() {
    let registry = registry();
    let error = Parser::new("x = shout`never closed\n")
        .with_dsl_registry(&registry)
        .parse()
        .unwrap_err();
    assert!(matches!(error, FusionError::Syntax { .. }));
}
