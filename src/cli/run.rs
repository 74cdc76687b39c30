//! Execute a single query against a notes file

use serde::Serialize;

use super::CliError;
use crate::{
    ast::QueryType,
    config::EngineConfig,
    engine::Engine,
    executor::ResultRows,
    note::NoteCollection,
};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub query: String,
    pub config: EngineConfig,
}

/// Machine-readable result of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub query_type: QueryType,
    pub result_count: usize,
    #[serde(flatten)]
    pub rows: ResultRows,
    pub discovered_links: Vec<String>,
    /// Candidates dropped because evaluating them failed
    pub skipped: usize,
    pub execution_time_ms: f64,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub markdown: String,
    pub report: RunReport,
}

pub fn execute_run(options: &RunOptions, notes: &NoteCollection) -> Result<RunOutput, CliError> {
    let engine = Engine::new(options.config.clone());
    let query = crate::parser::parse_query(&options.query)?;
    let result = engine.execute(&query, notes)?;

    let markdown = engine.render(&query, &result);
    let report = RunReport {
        query_type: result.query_type,
        result_count: result.result_count(),
        discovered_links: result.discovered_links,
        skipped: result.skipped.len(),
        execution_time_ms: result.elapsed.as_secs_f64() * 1000.0,
        rows: result.rows,
    };
    Ok(RunOutput { markdown, report })
}
