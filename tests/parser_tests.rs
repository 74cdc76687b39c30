// tests/parser_tests.rs

use noteql::ast::{CompareOp, Expr, FieldPath, Literal, QueryType, SortDirection, Source};
use noteql::lexer::Lexer;
use noteql::parser::{Parser, parse_query};

fn expr(source: &str) -> Expr {
    Parser::new(Lexer::new(source)).unwrap().parse().unwrap()
}

// ============================================================================
// Query shapes
// ============================================================================

#[test]
fn test_full_table_query() {
    let query = parse_query(
        r#"TABLE file.name, status FROM "projects" WHERE status = "active" SORT priority DESC LIMIT 10"#,
    )
    .unwrap();

    assert_eq!(query.query_type, QueryType::Table);
    let fields: Vec<Expr> = query.fields.iter().map(|f| f.expr.clone()).collect();
    assert_eq!(fields, vec![Expr::field("file.name"), Expr::field("status")]);
    assert!(query.fields.iter().all(|f| f.alias.is_none()));
    assert_eq!(query.from, Some(Source::Folder("projects".into())));
    assert_eq!(
        query.filter,
        Some(Expr::compare(
            CompareOp::Equal,
            Expr::field("status"),
            Expr::string("active")
        ))
    );
    assert_eq!(query.sort.len(), 1);
    assert_eq!(query.sort[0].expr, Expr::field("priority"));
    assert_eq!(query.sort[0].direction, SortDirection::Desc);
    assert_eq!(query.limit, Some(10));
}

#[test]
fn test_table_without_fields_is_legal() {
    let query = parse_query(r#"TABLE FROM "projects""#).unwrap();
    assert_eq!(query.query_type, QueryType::Table);
    assert!(query.fields.is_empty());
}

#[test]
fn test_field_aliases() {
    let query = parse_query(r#"TABLE status AS "State", file.mtime AS modified"#).unwrap();
    assert_eq!(query.fields[0].header(), "State");
    assert_eq!(query.fields[1].header(), "modified");
}

#[test]
fn test_header_defaults_to_source_text() {
    let query = parse_query("TABLE length(tags)").unwrap();
    assert_eq!(query.fields[0].header(), "length(tags)");
}

#[test]
fn test_list_and_task() {
    assert_eq!(parse_query("LIST").unwrap().query_type, QueryType::List);
    let task = parse_query("task where !completed").unwrap();
    assert_eq!(task.query_type, QueryType::Task);
    assert_eq!(task.filter, Some(Expr::not(Expr::field("completed"))));
}

#[test]
fn test_sort_defaults_to_ascending() {
    let query = parse_query("LIST SORT file.name, priority descending").unwrap();
    assert_eq!(query.sort[0].direction, SortDirection::Asc);
    assert_eq!(query.sort[1].direction, SortDirection::Desc);
}

// ============================================================================
// FROM sources
// ============================================================================

#[test]
fn test_from_tag_and_link() {
    assert_eq!(
        parse_query("LIST FROM #area/health").unwrap().from,
        Some(Source::Tag("area/health".into()))
    );
    assert_eq!(
        parse_query("LIST FROM [[Weekly Review]]").unwrap().from,
        Some(Source::Link("Weekly Review".into()))
    );
}

#[test]
fn test_from_combinations() {
    let query = parse_query(r#"LIST FROM #work AND -"archive" OR #urgent"#).unwrap();
    assert_eq!(
        query.from,
        Some(Source::Or(
            Box::new(Source::And(
                Box::new(Source::Tag("work".into())),
                Box::new(Source::Not(Box::new(Source::Folder("archive".into())))),
            )),
            Box::new(Source::Tag("urgent".into())),
        ))
    );
}

// ============================================================================
// Expression precedence
// ============================================================================

#[test]
fn test_and_binds_tighter_than_or() {
    let flat = expr(r#"status = "active" AND priority > 2 OR flagged = true"#);
    let grouped = expr(r#"(status = "active" AND priority > 2) OR (flagged = true)"#);
    assert_eq!(flat, grouped);

    assert_eq!(
        flat,
        Expr::or(
            Expr::and(
                Expr::compare(CompareOp::Equal, Expr::field("status"), Expr::string("active")),
                Expr::compare(CompareOp::GreaterThan, Expr::field("priority"), Expr::integer(2)),
            ),
            Expr::compare(
                CompareOp::Equal,
                Expr::field("flagged"),
                Expr::Literal(Literal::Boolean(true))
            ),
        )
    );
}

#[test]
fn test_not_binds_tighter_than_and() {
    assert_eq!(
        expr("NOT a AND b"),
        Expr::and(Expr::not(Expr::field("a")), Expr::field("b"))
    );
}

#[test]
fn test_not_applies_to_comparison() {
    assert_eq!(
        expr("NOT a = 1"),
        Expr::not(Expr::compare(CompareOp::Equal, Expr::field("a"), Expr::integer(1)))
    );
}

#[test]
fn test_function_call() {
    assert_eq!(
        expr(r##"contains(file.tags, "#x")"##),
        Expr::Call {
            name: "contains".into(),
            args: vec![Expr::Field(FieldPath::parse("file.tags")), Expr::string("#x")],
        }
    );
}

#[test]
fn test_unknown_function_parses() {
    assert!(parse_query("LIST WHERE nosuchfn(a, b)").is_ok());
}

#[test]
fn test_display_round_trips() {
    let source =
        r#"TABLE file.name, status FROM "projects" WHERE status = "active" SORT priority DESC LIMIT 10"#;
    let query = parse_query(source).unwrap();
    assert_eq!(query.to_string(), source);
    assert_eq!(parse_query(&query.to_string()).unwrap(), query);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_limit_must_be_positive() {
    let err = parse_query("LIST LIMIT 0").unwrap_err();
    assert_eq!(err.expected, vec!["positive integer".to_string()]);
    assert!(parse_query("LIST LIMIT -5").is_err());
    assert!(parse_query("LIST LIMIT many").is_err());
}

#[test]
fn test_list_rejects_fields() {
    let err = parse_query("LIST file.name").unwrap_err();
    assert!(err.message.contains("do not accept a field list"));
    assert!(parse_query("TASK text").is_err());
}

#[test]
fn test_calendar_is_reserved() {
    let err = parse_query("CALENDAR file.ctime").unwrap_err();
    assert_eq!(err.found.as_deref(), Some("CALENDAR"));
}

#[test]
fn test_error_names_expected_and_found() {
    let err = parse_query("LIST WHERE").unwrap_err();
    assert_eq!(err.expected, vec!["expression".to_string()]);
    assert_eq!(err.found.as_deref(), Some("end of query"));
    assert_eq!(err.position.offset, 10);
}

#[test]
fn test_clauses_in_fixed_order() {
    assert!(parse_query(r#"LIST WHERE a = 1 FROM "x""#).is_err());
}

#[test]
fn test_missing_query_type() {
    let err = parse_query(r#"FROM "x""#).unwrap_err();
    assert_eq!(err.expected, vec!["TABLE", "LIST", "TASK"]);
}
