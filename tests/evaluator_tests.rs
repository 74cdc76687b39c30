// tests/evaluator_tests.rs

use chrono::{TimeZone, Utc};
use noteql::ast::FieldPath;
use noteql::resolver::{NoteEnv, resolve_note_field};
use noteql::{EvalError, Evaluator, FunctionRegistry, Lexer, Note, Parser, Value};

fn eval(source: &str, note: &Note) -> Result<Value, EvalError> {
    let expr = Parser::new(Lexer::new(source)).unwrap().parse().unwrap();
    let functions = FunctionRegistry::default();
    Evaluator::new(&functions).eval_expr(&expr, &NoteEnv { note })
}

fn truthy(source: &str, note: &Note) -> bool {
    eval(source, note).unwrap().is_truthy()
}

fn project() -> Note {
    Note::new("projects/alpha.md", "Links to [[Beta]] and #area/health")
        .with_title("Alpha")
        .with_field("status", "active")
        .with_field("priority", 3i64)
        .with_field("estimate", "2.50")
        .with_field("tags", Value::Array(vec!["work".into()]))
        .with_field("name", "frontmatter name")
        .with_times(
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        )
}

// ============================================================================
// Field resolution
// ============================================================================

#[test]
fn test_file_namespace_cannot_be_shadowed() {
    let note = project().with_field("file.name", "shadow");
    assert_eq!(eval("file.name", &note).unwrap(), Value::String("alpha".into()));
    assert_eq!(eval("name", &note).unwrap(), Value::String("frontmatter name".into()));
}

#[test]
fn test_virtual_attributes() {
    let note = project();
    assert_eq!(eval("file.link", &note).unwrap(), Value::String("[[Alpha]]".into()));
    assert_eq!(eval("file.path", &note).unwrap(), Value::String("projects/alpha.md".into()));
    assert_eq!(eval("file.folder", &note).unwrap(), Value::String("projects".into()));
    assert_eq!(
        eval("file.size", &note).unwrap(),
        Value::Integer(note.body.len() as i64)
    );
    assert!(matches!(eval("file.mtime", &note).unwrap(), Value::Date(_)));
    assert_eq!(eval("file.nonsense", &note).unwrap(), Value::Absent);
}

#[test]
fn test_tags_and_outlinks() {
    let note = project();
    assert_eq!(
        resolve_note_field(&note, &FieldPath::parse("file.tags")),
        Value::Array(vec!["#work".into(), "#area/health".into()])
    );
    assert!(truthy("contains(file.outlinks, [[Beta]])", &note));
    assert!(truthy("contains(file.tags, #work)", &note));
}

#[test]
fn test_list_fields_resolve_to_lists() {
    assert_eq!(
        eval("tags", &project()).unwrap(),
        Value::Array(vec!["work".into()])
    );
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_absent_field_equality() {
    let note = project();
    assert!(!truthy(r#"owner = "x""#, &note));
    assert!(truthy(r#"owner != "x""#, &note));
    assert!(!truthy("owner", &note));
    assert!(truthy("NOT owner", &note));
}

#[test]
fn test_numeric_comparisons() {
    let note = project();
    assert!(truthy("priority > 2", &note));
    assert!(truthy("priority >= 3", &note));
    assert!(!truthy("priority < 3", &note));
    assert!(truthy("estimate = 2.5", &note));
    assert!(truthy("estimate < 3", &note));
}

#[test]
fn test_string_comparison_is_ordinal() {
    let note = project();
    assert!(truthy(r#"status > "Zebra""#, &note));
    assert!(truthy(r#"status < "b""#, &note));
}

#[test]
fn test_date_comparisons() {
    let note = project();
    assert!(truthy(r#"file.ctime = "2024-01-05""#, &note));
    assert!(truthy(r#"file.mtime > "2024-02-01""#, &note));
}

#[test]
fn test_failed_coercion_is_an_error() {
    let err = eval(r#"status > 5"#, &project()).unwrap_err();
    match err {
        EvalError::Coercion { expr, .. } => assert_eq!(expr, r#"status > 5"#),
        other => panic!("Expected coercion error, got {:?}", other),
    }
}

#[test]
fn test_ordering_against_absent_is_false() {
    assert!(!truthy("owner > 1", &project()));
    assert!(!truthy("owner <= 1", &project()));
}

// ============================================================================
// Logic
// ============================================================================

#[test]
fn test_short_circuit_skips_errors() {
    let note = project();
    assert!(!truthy("false AND nosuchfn()", &note));
    assert!(truthy("true OR status > 5", &note));
    assert!(eval("true AND status > 5", &note).is_err());
}

#[test]
fn test_not_uses_truthiness() {
    let note = Note::new("a.md", "")
        .with_field("empty", "")
        .with_field("zero", 0i64)
        .with_field("none", Value::Array(vec![]));
    assert!(truthy("!empty AND !zero AND !none", &note));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_builtin_functions() {
    let note = project();
    assert!(truthy(r#"contains(status, "act")"#, &note));
    assert!(truthy(r#"contains(tags, "work")"#, &note));
    assert_eq!(eval("length(status)", &note).unwrap(), Value::Integer(6));
    assert_eq!(eval("length(tags)", &note).unwrap(), Value::Integer(1));
    assert_eq!(eval("upper(status)", &note).unwrap(), Value::String("ACTIVE".into()));
    assert_eq!(eval("LOWER(\"MiXeD\")", &note).unwrap(), Value::String("mixed".into()));
    assert!(truthy(r#"startswith(file.name, "al")"#, &note));
    assert_eq!(
        eval(r#"default(owner, "nobody")"#, &note).unwrap(),
        Value::String("nobody".into())
    );
}

#[test]
fn test_unknown_function() {
    let err = eval("nosuchfn(status)", &project()).unwrap_err();
    assert!(matches!(err, EvalError::UnknownFunction { ref name, .. } if name == "nosuchfn"));
}

#[test]
fn test_arity_mismatch() {
    let err = eval("length(status, tags)", &project()).unwrap_err();
    assert_eq!(
        err,
        EvalError::Arity {
            name: "length".into(),
            expected: 1,
            found: 2,
            expr: "length(status, tags)".into(),
        }
    );
}

#[test]
fn test_type_error_names_expression() {
    let err = eval("upper(priority)", &project()).unwrap_err();
    assert!(err.to_string().contains("`upper(priority)`"));
}

#[test]
fn test_custom_function() {
    let mut functions = FunctionRegistry::default();
    functions.register("double", 1, |args| match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(n * 2)),
        other => Err(EvalError::type_error(format!("cannot double {}", other.type_name()))),
    });

    let note = project();
    let expr = Parser::new(Lexer::new("double(priority) = 6"))
        .unwrap()
        .parse()
        .unwrap();
    let result = Evaluator::new(&functions)
        .eval_expr(&expr, &NoteEnv { note: &note })
        .unwrap();
    assert_eq!(result, Value::Boolean(true));
}
