//! Per-block and per-document query processing.
//!
//! [`Engine::process_block`] is the isolation boundary: whatever goes wrong
//! inside one block, including a panic, comes back as a [`BlockOutcome`]
//! with status `error`, and sibling blocks still run.

use std::{
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use serde::Serialize;
use tracing::instrument;

use crate::{
    ast::{Query, QueryType},
    config::EngineConfig,
    detector::{Detector, QueryBlock},
    error::QueryError,
    executor::{ExecutionResult, Executor},
    functions::FunctionRegistry,
    note::{Note, NoteCollection},
    output::{ErrorSummary, MarkdownRenderer, QuerySummary, Status, render_error},
    parser,
};

/// Heading of the section appended to a rendered document.
pub const RESULTS_HEADING: &str = "## Query Results";

/// Result of processing one query block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockOutcome {
    pub id: String,
    pub query_type: Option<QueryType>,
    pub source_text: String,
    /// One-based line of the block in its document
    pub line_number: usize,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
    pub result_count: usize,
    pub discovered_links: Vec<String>,
    pub execution_time_ms: f64,
}

impl BlockOutcome {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn summary(&self) -> QuerySummary {
        QuerySummary {
            id: self.id.clone(),
            query_type: self.query_type,
            status: self.status,
            result_count: self.result_count,
            execution_time_ms: self.execution_time_ms,
            error: self.error.clone(),
        }
    }

    /// Markdown shown for this block: its results or an inline error.
    pub fn markdown(&self) -> String {
        match (&self.result_markdown, &self.error) {
            (Some(markdown), _) => markdown.clone(),
            (None, Some(error)) => render_error(error),
            (None, None) => String::new(),
        }
    }
}

/// Outcomes for every block of one document plus the combined rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub blocks: Vec<BlockOutcome>,
    /// The document followed by a results section, one subsection per block
    pub rendered: String,
}

impl DocumentReport {
    pub fn failed(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_success()).count()
    }
}

/// Query engine: configuration plus the function registry.
///
/// Holds no per-query state; one engine can serve any number of documents,
/// from any number of threads.
///
/// # Examples
///
/// ```
/// use noteql::{Engine, Note, NoteCollection};
///
/// let notes = NoteCollection::new(vec![
///     Note::new("projects/a.md", "").with_field("status", "active"),
///     Note::new("projects/b.md", "").with_field("status", "done"),
/// ]);
/// let engine = Engine::default();
///
/// let result = engine
///     .run_query(r#"LIST FROM "projects" WHERE status = "active""#, &notes)
///     .unwrap();
/// assert_eq!(result.discovered_links, vec!["projects/a.md".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    functions: FunctionRegistry,
    detector: Detector,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            detector: Detector::new(&config),
            config,
            functions: FunctionRegistry::default(),
        }
    }

    /// Replaces the function registry.
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Parses and executes one query.
    pub fn run_query(
        &self,
        source: &str,
        notes: &NoteCollection,
    ) -> Result<ExecutionResult, QueryError> {
        let query = parser::parse_query(source)?;
        self.execute(&query, notes)
    }

    /// Executes a parsed query over the notes, capped at `max_notes`.
    pub fn execute(
        &self,
        query: &Query,
        notes: &NoteCollection,
    ) -> Result<ExecutionResult, QueryError> {
        Executor::new(&self.functions).execute(query, self.bounded(notes))
    }

    /// Renders a result as markdown using the configured options.
    pub fn render(&self, query: &Query, result: &ExecutionResult) -> String {
        MarkdownRenderer::new(self.config.task_links).render(query, result)
    }

    fn bounded<'a>(&self, notes: &'a NoteCollection) -> &'a [Note] {
        let all = notes.notes();
        match self.config.max_notes {
            Some(max) if all.len() > max => {
                tracing::warn!(total = all.len(), max, "note collection truncated");
                &all[..max]
            }
            _ => all,
        }
    }

    /// Processes one block. Never fails; errors are reported in the outcome.
    #[instrument(skip_all, fields(id = %block.id, line = block.start_line))]
    pub fn process_block(&self, block: &QueryBlock, notes: &NoteCollection) -> BlockOutcome {
        let started = Instant::now();
        let mut query_type = None;

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let query = block.parse()?;
            tracing::debug!(query_type = %query.query_type, "parsed block");
            query_type = Some(query.query_type);
            let result = self.execute(&query, notes)?;
            let markdown = self.render(&query, &result);
            Ok::<_, QueryError>((result, markdown))
        }));

        let outcome = attempt.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(source = %block.source, %message, "query block panicked");
            Err(QueryError::Unexpected(message))
        });

        let mut report = BlockOutcome {
            id: block.id.clone(),
            query_type,
            source_text: block.source.clone(),
            line_number: block.start_line,
            status: Status::Success,
            result_markdown: None,
            error: None,
            result_count: 0,
            discovered_links: Vec::new(),
            execution_time_ms: 0.0,
        };

        match outcome {
            Ok((result, markdown)) => {
                report.result_markdown = Some(markdown);
                report.result_count = result.result_count();
                report.discovered_links = result.discovered_links;
            }
            Err(error) => {
                tracing::debug!(kind = %error.kind(), error = %error.detail(), "block failed");
                report.status = Status::Error;
                report.error = Some(ErrorSummary::from(&error));
            }
        }
        report.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        report
    }

    /// Detects and processes every block of a document.
    pub fn process_document(&self, document: &str, notes: &NoteCollection) -> DocumentReport {
        let blocks: Vec<BlockOutcome> = self
            .detector
            .detect(document)
            .iter()
            .map(|block| self.process_block(block, notes))
            .collect();

        let rendered = render_document(document, &blocks);
        DocumentReport { blocks, rendered }
    }
}

/// Appends a results section to `document`. A document without blocks is
/// returned unchanged.
pub fn render_document(document: &str, blocks: &[BlockOutcome]) -> String {
    if blocks.is_empty() {
        return document.to_string();
    }

    let mut out = document.trim_end().to_string();
    out.push_str("\n\n---\n\n");
    out.push_str(RESULTS_HEADING);
    out.push('\n');
    for block in blocks {
        out.push_str(&format!(
            "\n### {} (line {})\n\n{}\n",
            block.id,
            block.line_number,
            block.markdown()
        ));
    }
    out
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "query processing panicked".to_string()
    }
}

