//! Extraction of checkbox tasks from a note body.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::{
    detector::FenceTracker,
    value::{Value, parse_date},
};

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+\[(.)\]\s*(.*?)\s*$").expect("valid task pattern")
});

/// `[key:: value]` or `(key:: value)`
static INLINE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\[(]([\p{L}\p{N}_-]+)::\s*([^\])]*?)\s*[\])]").expect("valid field pattern")
});

static EMOJI_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(📅|⏳|🛫|✅|➕)️?\s*(\d{4}-\d{2}-\d{2})").expect("valid date pattern")
});

static TASK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)#([\p{L}\p{N}_][\p{L}\p{N}_/-]*)").expect("valid tag pattern")
});

/// One checkbox list item.
///
/// Task records are built fresh for every TASK query and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    /// Path of the owning note
    pub path: String,
    /// One-based line within the note body
    pub line: usize,
    pub text: String,
    /// The character between the brackets (`' '`, `'x'`, `'/'`, ...)
    pub status: char,
    pub completed: bool,
    /// Inline fields, emoji dates (`due`, `scheduled`, `start`, `completion`,
    /// `created`) and `tags`
    pub annotations: BTreeMap<String, Value>,
}

impl TaskRecord {
    /// Fields a TASK `WHERE` clause can see directly, before falling back to
    /// the owning note.
    pub fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "text" => Value::String(self.text.clone()),
            "completed" => Value::Boolean(self.completed),
            "checked" => Value::Boolean(self.status != ' '),
            "status" => Value::String(self.status.to_string()),
            "line" => Value::Integer(self.line as i64),
            _ => return self.annotations.get(name).cloned(),
        };
        Some(value)
    }
}

/// Returns the checkbox items of `body` in source order.
///
/// Plain list items and checkboxes inside fenced code are ignored.
pub fn extract_tasks(path: &str, body: &str) -> Vec<TaskRecord> {
    let mut tasks = Vec::new();
    let mut fences = FenceTracker::default();

    for (index, line) in body.lines().enumerate() {
        if fences.in_code(line) {
            continue;
        }
        let Some(captures) = TASK_LINE.captures(line) else {
            continue;
        };
        let status = captures[1].chars().next().unwrap_or(' ');
        let text = captures[2].to_string();

        tasks.push(TaskRecord {
            path: path.to_string(),
            line: index + 1,
            completed: status.eq_ignore_ascii_case(&'x'),
            status,
            annotations: annotations(&text),
            text,
        });
    }

    tracing::trace!(path, count = tasks.len(), "extracted tasks");
    tasks
}

fn annotations(text: &str) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();

    for captures in INLINE_FIELD.captures_iter(text) {
        fields.insert(captures[1].to_lowercase(), typed_value(&captures[2]));
    }

    for captures in EMOJI_DATE.captures_iter(text) {
        let key = match &captures[1] {
            "📅" => "due",
            "⏳" => "scheduled",
            "🛫" => "start",
            "✅" => "completion",
            _ => "created",
        };
        if let Some(date) = parse_date(&captures[2]) {
            fields.entry(key.to_string()).or_insert(Value::Date(date));
        }
    }

    let tags: Vec<Value> = TASK_TAG
        .captures_iter(text)
        .map(|c| Value::String(format!("#{}", &c[1])))
        .collect();
    if !tags.is_empty() {
        fields.insert("tags".to_string(), Value::Array(tags));
    }

    fields
}

/// Inline field text as the most specific value it reads as.
fn typed_value(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Integer(n);
    }
    if raw.starts_with(|c: char| c.is_ascii_digit() || c == '-')
        && let Ok(n) = raw.parse::<f64>()
    {
        return Value::Float(n);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    match parse_date(raw) {
        Some(date) => Value::Date(date),
        None => Value::String(raw.to_string()),
    }
}
