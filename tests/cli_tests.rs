// tests/cli_tests.rs
#![cfg(feature = "cli")]

use std::fs;

use noteql::cli::{
    self, CheckOptions, CliError, RenderOptions, RunOptions, execute_check, execute_render,
    execute_run,
};
use noteql::{EngineConfig, ErrorKind, QueryType};
use tempfile::TempDir;

const NOTES_JSON: &str = r#"[
  {"path": "projects/b.md", "title": "Beta",
   "frontmatter": {"status": "active", "priority": 3}},
  {"path": "projects/a.md", "title": "Alpha",
   "frontmatter": {"status": "active", "priority": 1},
   "body": "- [ ] Buy milk\n- [x] Pay rent",
   "modified": "2024-03-01T12:00:00Z"},
  {"path": "projects/c.md", "frontmatter": {"status": "done", "priority": 5,
   "meta": {"nested": true}}}
]"#;

fn write_notes(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("notes.json");
    fs::write(&path, NOTES_JSON).unwrap();
    path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_notes_sorts_by_path() {
    let dir = TempDir::new().unwrap();
    let notes = cli::load_notes(write_notes(&dir)).unwrap();
    let paths: Vec<&str> = notes.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(paths, vec!["projects/a.md", "projects/b.md", "projects/c.md"]);
    assert!(notes.get("projects/a.md").unwrap().modified.is_some());
    assert_eq!(
        notes.get("projects/c.md").unwrap().field("meta"),
        Some(&noteql::Value::String(r#"{"nested":true}"#.into()))
    );
}

#[test]
fn test_load_notes_reports_bad_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "[{").unwrap();
    assert!(matches!(cli::load_notes(&path), Err(CliError::Notes { .. })));
}

#[test]
fn test_load_notes_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = cli::load_notes(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CliError::Read { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_load_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"fence_languages": ["dql"], "max_notes": 2}"#).unwrap();

    let config = cli::load_config(Some(&path)).unwrap();
    assert_eq!(config.fence_languages, vec!["dql".to_string()]);
    assert_eq!(config.max_notes, Some(2));
    assert_eq!(config.inline_prefix.as_deref(), Some("dv:"));

    assert_eq!(cli::load_config(None).unwrap(), EngineConfig::default());
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_check_prints_canonical_form() {
    let checked = execute_check(&CheckOptions {
        query: "list  from #work where   a=1 sort b desc".into(),
        functions: false,
    })
    .unwrap();
    assert_eq!(checked.query_type, QueryType::List);
    assert_eq!(checked.canonical, "LIST FROM #work WHERE a = 1 SORT b DESC");
}

#[test]
fn test_check_reports_syntax_errors() {
    let err = execute_check(&CheckOptions {
        query: "LIST LIMIT 0".into(),
        functions: false,
    })
    .unwrap_err();
    assert!(matches!(err, CliError::Syntax(_)));
}

#[test]
fn test_check_functions() {
    let options = CheckOptions {
        query: "LIST WHERE nosuchfn(a)".into(),
        functions: true,
    };
    match execute_check(&options) {
        Err(CliError::Query(e)) => assert_eq!(e.kind(), ErrorKind::Execution),
        other => panic!("Expected execution error, got {:?}", other),
    }
}

#[test]
fn test_run_query() {
    let dir = TempDir::new().unwrap();
    let notes = cli::load_notes(write_notes(&dir)).unwrap();
    let output = execute_run(
        &RunOptions {
            query: r#"LIST WHERE status = "active" SORT priority DESC"#.into(),
            config: EngineConfig::default(),
        },
        &notes,
    )
    .unwrap();

    assert_eq!(output.markdown, "- [[Beta]]\n- [[Alpha]]");
    assert_eq!(output.report.result_count, 2);

    let json: serde_json::Value = serde_json::to_value(&output.report).unwrap();
    assert_eq!(json["type"], "list");
    assert_eq!(json["query_type"], "LIST");
    assert_eq!(json["discovered_links"][0], "projects/b.md");
}

#[test]
fn test_render_document() {
    let dir = TempDir::new().unwrap();
    let notes = cli::load_notes(write_notes(&dir)).unwrap();
    let report = execute_render(
        &RenderOptions {
            document: "# Todo\n\n```dataview\nTASK WHERE !completed\n```\n".into(),
            config: EngineConfig::default(),
        },
        &notes,
    )
    .unwrap();

    assert_eq!(report.blocks.len(), 1);
    assert!(report.rendered.contains("- [ ] Buy milk ([[Alpha]])"));
    assert!(!report.rendered.contains("Pay rent ("));
}

#[test]
fn test_render_requires_document() {
    let err = execute_render(&RenderOptions::default(), &noteql::NoteCollection::default())
        .unwrap_err();
    assert!(matches!(err, CliError::NoInput));
}
