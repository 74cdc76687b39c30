//! Runs a parsed query over a note collection.
//!
//! Stages: FROM narrows the notes, TASK queries expand notes into tasks,
//! WHERE is evaluated per candidate, the kept candidates are sorted and
//! truncated, then TABLE columns are computed for what remains. A candidate
//! whose WHERE or column evaluation fails is dropped and recorded; sort-key
//! failures fail the whole query.

use std::{
    cmp::Ordering,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    ast::{Query, QueryType, SortDirection, Source},
    error::{EvalError, QueryError},
    evaluator::Evaluator,
    functions::FunctionRegistry,
    note::Note,
    resolver::{Environment, NoteEnv, TaskEnv},
    tasks::{TaskRecord, extract_tasks},
    value::Value,
};

/// A TABLE row: the note's identity column plus one value per field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub identity: String,
    pub link: String,
    pub values: Vec<Value>,
}

/// A LIST entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub identity: String,
    pub link: String,
}

/// A TASK entry with a link to its note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskItem {
    pub task: TaskRecord,
    pub link: String,
}

/// Result rows, shaped by the query type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "rows", rename_all = "lowercase")]
pub enum ResultRows {
    Table {
        headers: Vec<String>,
        rows: Vec<TableRow>,
    },
    List(Vec<ListItem>),
    Task(Vec<TaskItem>),
}

impl ResultRows {
    pub fn len(&self) -> usize {
        match self {
            ResultRows::Table { rows, .. } => rows.len(),
            ResultRows::List(items) => items.len(),
            ResultRows::Task(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A candidate dropped because evaluating it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCandidate {
    pub path: String,
    /// Task line, for TASK candidates
    pub line: Option<usize>,
    pub error: EvalError,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub query_type: QueryType,
    pub rows: ResultRows,
    /// Identities of the notes behind the result rows, first occurrence order
    pub discovered_links: Vec<String>,
    pub skipped: Vec<SkippedCandidate>,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn result_count(&self) -> usize {
        self.rows.len()
    }
}

enum Candidate<'a> {
    Note(&'a Note),
    Task(TaskRecord, &'a Note),
}

impl<'a> Candidate<'a> {
    fn note(&self) -> &'a Note {
        match self {
            Candidate::Note(note) | Candidate::Task(_, note) => *note,
        }
    }

    fn line(&self) -> Option<usize> {
        match self {
            Candidate::Note(_) => None,
            Candidate::Task(task, _) => Some(task.line),
        }
    }

    fn skip(&self, error: EvalError) -> SkippedCandidate {
        SkippedCandidate {
            path: self.note().path.clone(),
            line: self.line(),
            error,
        }
    }

    fn with_env<R>(&self, f: impl FnOnce(&dyn Environment) -> R) -> R {
        match self {
            Candidate::Note(note) => f(&NoteEnv { note }),
            Candidate::Task(task, note) => f(&TaskEnv { task, note }),
        }
    }
}

/// A kept candidate with its TABLE column values.
struct Survivor<'a> {
    candidate: Candidate<'a>,
    values: Vec<Value>,
}

/// Whether a note belongs to a FROM source.
pub fn source_matches(source: &Source, note: &Note) -> bool {
    match source {
        Source::Folder(folder) => in_folder(note, folder),
        Source::Tag(tag) => note.has_tag(tag),
        Source::Link(target) => note.links_to(target),
        Source::And(left, right) => source_matches(left, note) && source_matches(right, note),
        Source::Or(left, right) => source_matches(left, note) || source_matches(right, note),
        Source::Not(inner) => !source_matches(inner, note),
    }
}

/// Folder prefix match on whole path segments; a file path matches itself.
fn in_folder(note: &Note, folder: &str) -> bool {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return true;
    }
    let note_folder = note.folder();
    let path = note.path.as_str();
    note_folder == folder
        || note_folder.starts_with(&format!("{}/", folder))
        || path == folder
        || path.strip_suffix(".md") == Some(folder)
}

/// Query executor, parameterised by the function registry.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'f> {
    evaluator: Evaluator<'f>,
}

impl<'f> Executor<'f> {
    pub fn new(functions: &'f FunctionRegistry) -> Self {
        Executor {
            evaluator: Evaluator::new(functions),
        }
    }

    /// Executes `query` over `notes`, which must already be in canonical order.
    pub fn execute(&self, query: &Query, notes: &[Note]) -> Result<ExecutionResult, QueryError> {
        let started = Instant::now();

        // Calls are resolved before any candidate is touched, so an unknown
        // function fails the query even when no note reaches WHERE
        for expr in query.expressions() {
            self.evaluator.check_calls(expr)?;
        }

        let sources: Vec<&Note> = notes
            .iter()
            .filter(|note| query.from.as_ref().is_none_or(|s| source_matches(s, note)))
            .collect();

        let candidates: Vec<Candidate<'_>> = match query.query_type {
            QueryType::Task => sources
                .into_iter()
                .flat_map(|note| {
                    extract_tasks(&note.path, &note.body)
                        .into_iter()
                        .map(move |task| Candidate::Task(task, note))
                })
                .collect(),
            _ => sources.into_iter().map(Candidate::Note).collect(),
        };

        let outcomes = evaluate_all(candidates, |candidate| self.filter(query, candidate));

        let mut kept = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(Some(candidate)) => kept.push(candidate),
                Ok(None) => {}
                Err(dropped) => skipped.push(dropped),
            }
        }

        if !query.sort.is_empty() {
            kept = self.sort(query, kept)?;
        }

        if let Some(limit) = query.limit {
            kept.truncate(limit);
        }

        // Columns are computed only for rows that survived the limit
        let mut survivors = Vec::with_capacity(kept.len());
        for outcome in evaluate_all(kept, |candidate| self.columns(query, candidate)) {
            match outcome {
                Ok(survivor) => survivors.push(survivor),
                Err(dropped) => skipped.push(dropped),
            }
        }

        for dropped in &skipped {
            tracing::warn!(
                path = %dropped.path,
                line = ?dropped.line,
                error = %dropped.error,
                "dropping candidate"
            );
        }

        let mut discovered_links: Vec<String> = Vec::new();
        for survivor in &survivors {
            let identity = survivor.candidate.note().identity();
            if !discovered_links.iter().any(|link| link == identity) {
                discovered_links.push(identity.to_string());
            }
        }

        let rows = build_rows(query, survivors);

        Ok(ExecutionResult {
            query_type: query.query_type,
            rows,
            discovered_links,
            skipped,
            elapsed: started.elapsed(),
        })
    }

    /// WHERE for one candidate. `Ok(None)` means filtered out.
    fn filter<'a>(
        &self,
        query: &Query,
        candidate: Candidate<'a>,
    ) -> Result<Option<Candidate<'a>>, SkippedCandidate> {
        let Some(filter) = &query.filter else {
            return Ok(Some(candidate));
        };
        match candidate.with_env(|env| self.evaluator.matches(filter, env)) {
            Ok(true) => Ok(Some(candidate)),
            Ok(false) => Ok(None),
            Err(error) => Err(candidate.skip(error)),
        }
    }

    /// TABLE column values for one kept candidate.
    fn columns<'a>(
        &self,
        query: &Query,
        candidate: Candidate<'a>,
    ) -> Result<Survivor<'a>, SkippedCandidate> {
        let values = candidate.with_env(|env| {
            query
                .fields
                .iter()
                .map(|field| self.evaluator.eval_expr(&field.expr, env))
                .collect::<Result<Vec<_>, _>>()
        });
        match values {
            Ok(values) => Ok(Survivor { candidate, values }),
            Err(error) => Err(candidate.skip(error)),
        }
    }

    /// Orders candidates by the sort keys, then by path and task line.
    fn sort<'a>(
        &self,
        query: &Query,
        candidates: Vec<Candidate<'a>>,
    ) -> Result<Vec<Candidate<'a>>, QueryError> {
        let mut keyed = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let keys = candidate.with_env(|env| {
                query
                    .sort
                    .iter()
                    .map(|key| self.evaluator.eval_expr(&key.expr, env))
                    .collect::<Result<Vec<_>, _>>()
            })?;
            keyed.push((keys, candidate));
        }

        keyed.sort_by(|(keys_a, a), (keys_b, b)| {
            for ((x, y), key) in keys_a.iter().zip(keys_b).zip(&query.sort) {
                let ord = match key.direction {
                    SortDirection::Asc => x.sort_cmp(y),
                    SortDirection::Desc => y.sort_cmp(x),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.note()
                .path
                .cmp(&b.note().path)
                .then_with(|| a.line().cmp(&b.line()))
        });

        Ok(keyed.into_iter().map(|(_, candidate)| candidate).collect())
    }
}

fn build_rows(query: &Query, survivors: Vec<Survivor<'_>>) -> ResultRows {
    match query.query_type {
        QueryType::Table => ResultRows::Table {
            headers: query.fields.iter().map(|field| field.header()).collect(),
            rows: survivors
                .into_iter()
                .map(|survivor| {
                    let note = survivor.candidate.note();
                    TableRow {
                        identity: note.identity().to_string(),
                        link: note.link(),
                        values: survivor.values,
                    }
                })
                .collect(),
        },
        QueryType::List => ResultRows::List(
            survivors
                .into_iter()
                .map(|survivor| {
                    let note = survivor.candidate.note();
                    ListItem {
                        identity: note.identity().to_string(),
                        link: note.link(),
                    }
                })
                .collect(),
        ),
        QueryType::Task => ResultRows::Task(
            survivors
                .into_iter()
                .filter_map(|survivor| match survivor.candidate {
                    Candidate::Task(task, note) => Some(TaskItem {
                        task,
                        link: note.link(),
                    }),
                    Candidate::Note(_) => None,
                })
                .collect(),
        ),
    }
}

/// Maps candidates in order; in parallel when the `parallel` feature is on.
#[cfg(feature = "parallel")]
fn evaluate_all<'a, T, F>(candidates: Vec<Candidate<'a>>, f: F) -> Vec<T>
where
    F: Fn(Candidate<'a>) -> T + Sync + Send,
    T: Send,
{
    use rayon::prelude::*;
    candidates.into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_all<'a, T, F>(candidates: Vec<Candidate<'a>>, f: F) -> Vec<T>
where
    F: Fn(Candidate<'a>) -> T,
{
    candidates.into_iter().map(f).collect()
}
