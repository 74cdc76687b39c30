//! Rendering of query results.
//!
//! Two outputs per query block:
//!
//! - **Markdown** via [`MarkdownRenderer`] - a table for TABLE, a bullet list
//!   of links for LIST, a checklist for TASK. Deterministic: the same result
//!   always renders to the same bytes.
//! - **Summary** via [`QuerySummary`] - id, type, status, row count, timing
//!   and error detail, as one text line or as JSON ([`to_json()`],
//!   [`to_json_pretty()`]).
//!
//! Rendering never fails. A result that cannot be rendered degrades to the
//! empty-result message.

use std::fmt::{self, Write};

use serde::Serialize;

use crate::{
    ast::{Query, QueryType},
    error::{ErrorKind, QueryError},
    executor::{ExecutionResult, ResultRows},
    value::Value,
};

/// Shown in place of an empty result.
pub const EMPTY_RESULT: &str = "_No results._";

/// Header of the identity column that leads every table.
pub const IDENTITY_HEADER: &str = "File";

pub struct MarkdownRenderer {
    task_links: bool,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        MarkdownRenderer::new(true)
    }
}

impl MarkdownRenderer {
    pub fn new(task_links: bool) -> Self {
        MarkdownRenderer { task_links }
    }

    /// Renders `result` as markdown.
    pub fn render(&self, query: &Query, result: &ExecutionResult) -> String {
        if result.rows.is_empty() {
            return EMPTY_RESULT.to_string();
        }
        match self.try_render(query, result) {
            Ok(markdown) => markdown,
            Err(_) => {
                tracing::warn!(
                    query_type = %query.query_type,
                    rows = result.rows.len(),
                    "result could not be rendered"
                );
                EMPTY_RESULT.to_string()
            }
        }
    }

    fn try_render(&self, query: &Query, result: &ExecutionResult) -> Result<String, fmt::Error> {
        let mut out = String::new();

        match (&result.rows, query.query_type) {
            (ResultRows::Table { headers, rows }, QueryType::Table) => {
                write!(out, "| {} |", IDENTITY_HEADER)?;
                for header in headers {
                    write!(out, " {} |", escape_cell(header))?;
                }
                out.push_str("\n| --- |");
                out.push_str(&" --- |".repeat(headers.len()));
                out.push('\n');

                for row in rows {
                    if row.values.len() != headers.len() {
                        return Err(fmt::Error);
                    }
                    write!(out, "| {} |", escape_cell(&row.link))?;
                    for value in &row.values {
                        write!(out, " {} |", render_cell(value))?;
                    }
                    out.push('\n');
                }
            }
            (ResultRows::List(items), QueryType::List) => {
                for item in items {
                    writeln!(out, "- {}", item.link)?;
                }
            }
            (ResultRows::Task(items), QueryType::Task) => {
                for item in items {
                    write!(out, "- [{}] {}", item.task.status, item.task.text)?;
                    if self.task_links {
                        write!(out, " ({})", item.link)?;
                    }
                    out.push('\n');
                }
            }
            _ => return Err(fmt::Error),
        }

        Ok(out.trim_end().to_string())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

fn render_cell(value: &Value) -> String {
    escape_cell(&value.render())
}

/// Inline markdown shown in place of a failed block's results.
pub fn render_error(error: &ErrorSummary) -> String {
    format!(
        "> **Query error** ({}): {}",
        error.kind,
        error.message.replace('\n', " ")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&QueryError> for ErrorSummary {
    fn from(error: &QueryError) -> Self {
        ErrorSummary {
            kind: error.kind(),
            message: error.detail(),
        }
    }
}

/// Compact status of one query block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    pub id: String,
    /// Unknown when the block failed to parse
    pub query_type: Option<QueryType>,
    pub status: Status,
    pub result_count: usize,
    pub execution_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
}

impl QuerySummary {
    /// One line, e.g. `dv-1 TABLE success: 2 results in 0.41ms`.
    pub fn line(&self) -> String {
        let query_type = self
            .query_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string());
        match (&self.status, &self.error) {
            (Status::Error, Some(error)) => format!(
                "{} {} error ({}): {}",
                self.id, query_type, error.kind, error.message
            ),
            _ => format!(
                "{} {} success: {} result{} in {:.2}ms",
                self.id,
                query_type,
                self.result_count,
                if self.result_count == 1 { "" } else { "s" },
                self.execution_time_ms
            ),
        }
    }
}

/// Serializes to compact JSON.
///
/// # Examples
///
/// ```
/// use noteql::output::{QuerySummary, Status, to_json};
///
/// let summary = QuerySummary {
///     id: "dv-1".into(),
///     query_type: None,
///     status: Status::Success,
///     result_count: 0,
///     execution_time_ms: 0.0,
///     error: None,
/// };
/// assert_eq!(
///     to_json(&summary),
///     r#"{"id":"dv-1","query_type":null,"status":"success","result_count":0,"execution_time_ms":0.0}"#
/// );
/// ```
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Serializes to JSON with 2-space indentation.
pub fn to_json_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}
