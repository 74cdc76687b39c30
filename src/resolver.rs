//! Field resolution for query candidates.
//!
//! `file.*` names always resolve against the note's virtual attributes, so
//! frontmatter can never shadow them. Other names resolve against
//! frontmatter. A missing field is [`Value::Absent`], never an error.

use std::collections::BTreeMap;

use crate::{ast::FieldPath, note::Note, tasks::TaskRecord, value::Value};

/// Namespace of virtual attributes.
pub const FILE_NAMESPACE: &str = "file";

/// Anything the evaluator can look fields up in.
pub trait Environment {
    fn lookup(&self, path: &FieldPath) -> Value;
}

/// Resolves a virtual `file.<name>` attribute.
pub fn file_attribute(note: &Note, name: &str) -> Value {
    match name {
        "name" => Value::String(note.name().to_string()),
        "title" => Value::String(note.title().to_string()),
        "link" => Value::String(note.link()),
        "path" => Value::String(note.path.clone()),
        "folder" => Value::String(note.folder().to_string()),
        "size" => Value::Integer(i64::try_from(note.size()).unwrap_or(i64::MAX)),
        "ctime" => note.created.map(Value::Date).unwrap_or(Value::Absent),
        "mtime" => note.modified.map(Value::Date).unwrap_or(Value::Absent),
        "tags" => Value::Array(note.tags().iter().cloned().map(Value::String).collect()),
        "outlinks" => Value::Array(
            note.outlinks()
                .iter()
                .map(|target| Value::String(format!("[[{}]]", target)))
                .collect(),
        ),
        _ => Value::Absent,
    }
}

/// Resolves `path` for a note.
///
/// # Examples
///
/// ```
/// use noteql::{Note, Value, ast::FieldPath, resolver::resolve_note_field};
///
/// let note = Note::new("work/alpha.md", "").with_field("name", "shadowed");
/// assert_eq!(
///     resolve_note_field(&note, &FieldPath::parse("file.name")),
///     Value::String("alpha".into())
/// );
/// assert_eq!(resolve_note_field(&note, &FieldPath::parse("owner")), Value::Absent);
/// ```
pub fn resolve_note_field(note: &Note, path: &FieldPath) -> Value {
    if let Some(rest) = path.strip_namespace(FILE_NAMESPACE) {
        return match rest {
            [name] => file_attribute(note, name),
            _ => Value::Absent,
        };
    }

    match path.segments.as_slice() {
        [key] => note.field(key).cloned().unwrap_or(Value::Absent),
        // Frontmatter keys may themselves contain dots
        _ => note
            .field(&path.to_string())
            .cloned()
            .unwrap_or(Value::Absent),
    }
}

/// Environment of a note candidate (TABLE and LIST queries).
#[derive(Debug, Clone, Copy)]
pub struct NoteEnv<'a> {
    pub note: &'a Note,
}

impl Environment for NoteEnv<'_> {
    fn lookup(&self, path: &FieldPath) -> Value {
        resolve_note_field(self.note, path)
    }
}

/// Environment of a task candidate: task fields first, then the owning note.
#[derive(Debug, Clone, Copy)]
pub struct TaskEnv<'a> {
    pub task: &'a TaskRecord,
    pub note: &'a Note,
}

impl Environment for TaskEnv<'_> {
    fn lookup(&self, path: &FieldPath) -> Value {
        if let [name] = path.segments.as_slice()
            && let Some(value) = self.task.field(name)
        {
            return value;
        }
        resolve_note_field(self.note, path)
    }
}

/// A plain map of dotted names to values, handy for evaluating standalone
/// expressions.
impl Environment for BTreeMap<String, Value> {
    fn lookup(&self, path: &FieldPath) -> Value {
        self.get(&path.to_string()).cloned().unwrap_or(Value::Absent)
    }
}
