//! Finds embedded query blocks in a markdown document.
//!
//! Detection is purely lexical: block bodies are not parsed here, so a broken
//! query is still found and later reported as a syntax error.

use serde::Serialize;

use crate::{ast::Query, config::EngineConfig, error::SyntaxError, parser};

/// How a block was written in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// A fenced code block tagged with a query language
    Fenced,
    /// A single-line code span starting with the inline prefix
    Inline,
}

/// One query found in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryBlock {
    /// `dv-1`, `dv-2`, ... in document order
    pub id: String,
    pub kind: BlockKind,
    pub source: String,
    /// One-based line of the opening fence (or of the inline span)
    pub start_line: usize,
    /// One-based line of the closing fence; the last line when unterminated
    pub end_line: usize,
}

impl QueryBlock {
    /// Parses the block body. Nothing is cached; callers parse on execution.
    pub fn parse(&self) -> Result<Query, SyntaxError> {
        parser::parse_query(&self.source)
    }
}

/// An opening or closing code fence line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    pub marker: char,
    pub len: usize,
    pub info: &'a str,
}

/// Recognises a fence line: up to three spaces, then three or more backticks
/// or tildes, then the info string.
pub(crate) fn parse_fence(line: &str) -> Option<Fence<'_>> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(Fence { marker, len, info })
}

fn closes(open: (char, usize), line: &str) -> bool {
    matches!(parse_fence(line), Some(f) if f.marker == open.0 && f.len >= open.1 && f.info.is_empty())
}

/// Tracks whether successive lines fall inside fenced code.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feeds the next line; true if it is a fence line or inside a fence.
    pub fn in_code(&mut self, line: &str) -> bool {
        match self.open {
            Some(open) => {
                if closes(open, line) {
                    self.open = None;
                }
                true
            }
            None => match parse_fence(line) {
                Some(fence) => {
                    self.open = Some((fence.marker, fence.len));
                    true
                }
                None => false,
            },
        }
    }
}

/// Scans documents for query blocks.
#[derive(Debug, Clone)]
pub struct Detector {
    fence_languages: Vec<String>,
    inline_prefix: Option<String>,
}

impl Default for Detector {
    fn default() -> Self {
        Detector::new(&EngineConfig::default())
    }
}

struct OpenBlock {
    marker: char,
    len: usize,
    is_query: bool,
    start_line: usize,
    body: Vec<String>,
}

impl Detector {
    pub fn new(config: &EngineConfig) -> Self {
        Detector {
            fence_languages: config
                .fence_languages
                .iter()
                .map(|lang| lang.to_lowercase())
                .collect(),
            inline_prefix: config
                .inline_prefix
                .as_ref()
                .filter(|prefix| !prefix.trim().is_empty())
                .cloned(),
        }
    }

    fn is_query_language(&self, info: &str) -> bool {
        let language = info.split_whitespace().next().unwrap_or("").to_lowercase();
        self.fence_languages.contains(&language)
    }

    /// Returns every query block in document order.
    pub fn detect(&self, document: &str) -> Vec<QueryBlock> {
        let mut found: Vec<(BlockKind, String, usize, usize)> = Vec::new();
        let mut open: Option<OpenBlock> = None;
        let mut last_line = 0;

        for (index, line) in document.lines().enumerate() {
            let line_no = index + 1;
            last_line = line_no;

            if let Some(block) = open.as_mut() {
                if closes((block.marker, block.len), line) {
                    if block.is_query {
                        found.push((
                            BlockKind::Fenced,
                            block.body.join("\n"),
                            block.start_line,
                            line_no,
                        ));
                    }
                    open = None;
                } else if block.is_query {
                    block.body.push(line.to_string());
                }
                continue;
            }

            if let Some(fence) = parse_fence(line) {
                open = Some(OpenBlock {
                    marker: fence.marker,
                    len: fence.len,
                    is_query: self.is_query_language(fence.info),
                    start_line: line_no,
                    body: Vec::new(),
                });
                continue;
            }

            if let Some(prefix) = &self.inline_prefix {
                for span in code_spans(line) {
                    if let Some(source) = span.trim_start().strip_prefix(prefix.as_str()) {
                        found.push((BlockKind::Inline, source.trim().to_string(), line_no, line_no));
                    }
                }
            }
        }

        // An unterminated fence runs to the end of the document
        if let Some(block) = open
            && block.is_query
        {
            found.push((BlockKind::Fenced, block.body.join("\n"), block.start_line, last_line));
        }

        found.sort_by_key(|(_, _, start, _)| *start);
        let blocks: Vec<QueryBlock> = found
            .into_iter()
            .enumerate()
            .map(|(i, (kind, source, start_line, end_line))| QueryBlock {
                id: format!("dv-{}", i + 1),
                kind,
                source,
                start_line,
                end_line,
            })
            .collect();

        tracing::debug!(count = blocks.len(), "detected query blocks");
        blocks
    }
}

/// Contents of the inline code spans on one line.
///
/// A span opens with a run of backticks and closes at the next run of the
/// same length.
fn code_spans(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - run_start;
        let content_start = i;

        let mut j = i;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let close_start = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - close_start == run {
                    closed = Some((close_start, j));
                    break;
                }
            } else {
                j += 1;
            }
        }

        match closed {
            Some((content_end, next)) => {
                spans.push(&line[content_start..content_end]);
                i = next;
            }
            None => break,
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_fences() {
        assert_eq!(
            parse_fence("```dataview"),
            Some(Fence {
                marker: '`',
                len: 3,
                info: "dataview"
            })
        );
        assert_eq!(parse_fence("  ~~~~ "), Some(Fence { marker: '~', len: 4, info: "" }));
        assert!(parse_fence("``not a fence").is_none());
        assert!(parse_fence("    ```indented code").is_none());
    }

    #[test]
    fn finds_code_spans() {
        assert_eq!(code_spans("a `one` b ``two ` x`` c"), vec!["one", "two ` x"]);
        assert!(code_spans("unclosed `span").is_empty());
    }
}
