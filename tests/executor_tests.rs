// tests/executor_tests.rs

use noteql::{
    Engine, EngineConfig, ErrorKind, EvalError, ExecutionResult, Executor, FunctionRegistry,
    MarkdownRenderer, Note, NoteCollection, QueryError, ResultRows, Value, parse_query,
};

fn projects() -> NoteCollection {
    NoteCollection::new(vec![
        Note::new("projects/a.md", "")
            .with_title("A")
            .with_field("status", "active")
            .with_field("priority", 1i64),
        Note::new("projects/b.md", "")
            .with_title("B")
            .with_field("status", "active")
            .with_field("priority", 3i64),
        Note::new("projects/c.md", "")
            .with_title("C")
            .with_field("status", "done")
            .with_field("priority", 5i64),
        Note::new("archive/d.md", "Old work, see [[A]] #work")
            .with_title("D")
            .with_field("status", "active")
            .with_field("priority", 9i64),
    ])
}

fn run(query: &str, notes: &NoteCollection) -> Result<ExecutionResult, QueryError> {
    Engine::default().run_query(query, notes)
}

fn identities(result: &ExecutionResult) -> Vec<String> {
    match &result.rows {
        ResultRows::Table { rows, .. } => rows.iter().map(|r| r.identity.clone()).collect(),
        ResultRows::List(items) => items.iter().map(|i| i.identity.clone()).collect(),
        ResultRows::Task(items) => items.iter().map(|i| i.task.path.clone()).collect(),
    }
}

// ============================================================================
// Pipeline stages
// ============================================================================

#[test]
fn test_filter_sort_limit() {
    let result = run(
        r#"TABLE file.name, status FROM "projects" WHERE status = "active" SORT priority DESC LIMIT 10"#,
        &projects(),
    )
    .unwrap();

    assert_eq!(identities(&result), vec!["projects/b.md", "projects/a.md"]);
    match &result.rows {
        ResultRows::Table { headers, rows } => {
            assert_eq!(headers, &vec!["file.name".to_string(), "status".to_string()]);
            assert_eq!(rows[0].values, vec![Value::from("b"), Value::from("active")]);
            assert_eq!(rows[0].link, "[[B]]");
        }
        other => panic!("Expected table rows, got {:?}", other),
    }
    assert_eq!(
        result.discovered_links,
        vec!["projects/b.md".to_string(), "projects/a.md".to_string()]
    );
}

#[test]
fn test_no_from_ranges_over_everything() {
    let result = run("LIST", &projects()).unwrap();
    assert_eq!(
        identities(&result),
        vec!["archive/d.md", "projects/a.md", "projects/b.md", "projects/c.md"]
    );
}

#[test]
fn test_limit_truncates_after_sort() {
    let result = run("LIST SORT priority DESC LIMIT 2", &projects()).unwrap();
    assert_eq!(identities(&result), vec!["archive/d.md", "projects/c.md"]);
}

#[test]
fn test_sort_ties_break_by_path() {
    let result = run("LIST SORT status", &projects()).unwrap();
    assert_eq!(
        identities(&result),
        vec!["archive/d.md", "projects/a.md", "projects/b.md", "projects/c.md"]
    );
}

#[test]
fn test_from_tag_link_and_negation() {
    let notes = projects();
    assert_eq!(identities(&run("LIST FROM #work", &notes).unwrap()), vec!["archive/d.md"]);
    assert_eq!(identities(&run("LIST FROM [[A]]", &notes).unwrap()), vec!["archive/d.md"]);
    assert_eq!(
        identities(&run(r#"LIST FROM -"projects""#, &notes).unwrap()),
        vec!["archive/d.md"]
    );
    assert_eq!(
        identities(&run(r#"LIST FROM "projects" AND NOT "projects/c.md""#, &notes).unwrap()),
        vec!["projects/a.md", "projects/b.md"]
    );
}

#[test]
fn test_folder_match_is_segment_based() {
    let notes = NoteCollection::new(vec![
        Note::new("proj/a.md", ""),
        Note::new("projects/b.md", ""),
    ]);
    assert_eq!(identities(&run(r#"LIST FROM "proj""#, &notes).unwrap()), vec!["proj/a.md"]);
}

#[test]
fn test_permalink_is_identity() {
    let notes = NoteCollection::new(vec![Note::new("a.md", "").with_permalink("notes/alpha")]);
    let result = run("LIST", &notes).unwrap();
    assert_eq!(result.discovered_links, vec!["notes/alpha".to_string()]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_absent_field_filters() {
    let notes = projects();
    assert!(run(r#"LIST WHERE owner = "x""#, &notes).unwrap().rows.is_empty());
    assert_eq!(run(r#"LIST WHERE owner != "x""#, &notes).unwrap().result_count(), 4);
}

#[test]
fn test_unknown_function_is_execution_error() {
    let err = run("LIST WHERE nosuchfn(status)", &projects()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);

    let empty = NoteCollection::default();
    let err = run("LIST WHERE nosuchfn(status)", &empty).unwrap_err();
    assert!(matches!(err, QueryError::Execution(EvalError::UnknownFunction { .. })));
}

#[test]
fn test_failing_candidates_are_dropped() {
    let notes = NoteCollection::new(vec![
        Note::new("a.md", "").with_field("priority", 2i64),
        Note::new("b.md", "").with_field("priority", "high"),
    ]);
    let result = run("LIST WHERE priority > 1", &notes).unwrap();
    assert_eq!(identities(&result), vec!["a.md"]);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "b.md");
    assert!(matches!(result.skipped[0].error, EvalError::Coercion { .. }));
}

#[test]
fn test_all_candidates_failing_is_an_empty_result() {
    let notes = NoteCollection::new(vec![Note::new("b.md", "").with_field("priority", "high")]);
    let result = run("LIST WHERE priority > 1", &notes).unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "b.md");
}

#[test]
fn test_columns_are_evaluated_after_limit() {
    let mut functions = FunctionRegistry::default();
    functions.register("boom", 1, |args| match &args[0] {
        Value::String(name) if name == "b" => Err(EvalError::type_error("boom")),
        other => Ok(other.clone()),
    });
    let notes = NoteCollection::new(vec![
        Note::new("a.md", "").with_field("p", 1i64),
        Note::new("b.md", "").with_field("p", 2i64),
    ]);
    let query = parse_query("TABLE boom(file.name) SORT p DESC LIMIT 1").unwrap();

    let result = Executor::new(&functions).execute(&query, notes.notes()).unwrap();
    // b wins the sort and is cut by its failing column; a is not promoted
    assert!(result.rows.is_empty());
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "b.md");

    let query = parse_query("TABLE boom(file.name) SORT p ASC LIMIT 1").unwrap();
    let result = Executor::new(&functions).execute(&query, notes.notes()).unwrap();
    assert_eq!(identities(&result), vec!["a.md"]);
    assert!(result.skipped.is_empty());
}

#[test]
fn test_sort_key_error_is_fatal() {
    let mut functions = FunctionRegistry::default();
    functions.register("explode", 1, |_| Err(EvalError::type_error("boom")));
    let query = parse_query("LIST SORT explode(file.name)").unwrap();

    let notes = projects();
    let err = Executor::new(&functions)
        .execute(&query, notes.notes())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_rerun_is_byte_identical() {
    let notes = projects();
    let query = parse_query(r#"TABLE status, priority WHERE status = "active" SORT priority"#).unwrap();
    let renderer = MarkdownRenderer::default();
    let engine = Engine::default();

    let first = renderer.render(&query, &engine.execute(&query, &notes).unwrap());
    let second = renderer.render(&query, &engine.execute(&query, &notes).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_max_notes_caps_collection() {
    let engine = Engine::new(EngineConfig {
        max_notes: Some(2),
        ..EngineConfig::default()
    });
    let result = engine.run_query("LIST", &projects()).unwrap();
    assert_eq!(identities(&result), vec!["archive/d.md", "projects/a.md"]);
}

#[test]
fn test_candidate_order_is_stable_across_many_notes() {
    // Exercises the same ordering guarantee with and without `--features parallel`
    let notes = NoteCollection::new(
        (0..200i64)
            .map(|i| Note::new(format!("n/{:03}.md", i), "").with_field("even", i % 2 == 0))
            .collect(),
    );
    let result = run("LIST WHERE even", &notes).unwrap();
    let expected: Vec<String> = (0..200).step_by(2).map(|i| format!("n/{:03}.md", i)).collect();
    assert_eq!(identities(&result), expected);
}
