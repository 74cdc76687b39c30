//! Note records supplied by the host, and the collection queries range over.
//!
//! The engine never mutates a note. Derived data (tags, outgoing links) is
//! computed on first use and cached inside the record.

use std::{collections::BTreeMap, sync::LazyLock, sync::OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{detector::FenceTracker, value::Value};

static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(,])#([\p{L}\p{N}_][\p{L}\p{N}_/-]*)").expect("valid tag pattern")
});

static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]|#]+)(?:#[^\]|]*)?(?:\|[^\]]*)?\]\]").expect("valid link pattern")
});

/// One note of the knowledge base.
///
/// Deserializes from JSON such as
///
/// ```json
/// {"path": "projects/alpha.md", "title": "Alpha",
///  "frontmatter": {"status": "active", "priority": 3},
///  "body": "- [ ] ship it"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Path relative to the knowledge base root, `/`-separated
    #[serde(deserialize_with = "deserialize_path")]
    pub path: String,

    /// Stable identity when the host has one; falls back to `path`
    #[serde(default)]
    pub permalink: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// Explicit folder; derived from `path` when absent
    #[serde(default)]
    pub folder: Option<String>,

    #[serde(default)]
    pub frontmatter: BTreeMap<String, Value>,

    /// Raw markdown body
    #[serde(default)]
    pub body: String,

    /// Size in bytes; defaults to the body length
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    #[serde(skip)]
    derived: OnceLock<Derived>,
}

#[derive(Debug, Clone)]
struct Derived {
    tags: Vec<String>,
    outlinks: Vec<String>,
}

impl Note {
    pub fn new(path: impl Into<String>, body: impl Into<String>) -> Self {
        let path: String = path.into();
        Note {
            path: normalize_path(&path),
            permalink: None,
            title: None,
            folder: None,
            frontmatter: BTreeMap::new(),
            body: body.into(),
            size: None,
            created: None,
            modified: None,
            derived: OnceLock::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_permalink(mut self, permalink: impl Into<String>) -> Self {
        self.permalink = Some(permalink.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.frontmatter.insert(key.into(), value.into());
        self.derived = OnceLock::new();
        self
    }

    pub fn with_times(mut self, created: DateTime<Utc>, modified: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self.modified = Some(modified);
        self
    }

    /// Stable identity: the permalink, or the path.
    pub fn identity(&self) -> &str {
        self.permalink.as_deref().unwrap_or(&self.path)
    }

    /// File name without folder and extension.
    pub fn name(&self) -> &str {
        let file = self.path.rsplit('/').next().unwrap_or(&self.path);
        match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file,
        }
    }

    pub fn title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => self.name(),
        }
    }

    pub fn folder(&self) -> &str {
        match &self.folder {
            Some(folder) => folder.trim_matches('/'),
            None => self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(""),
        }
    }

    /// Wiki link to this note, `[[Title]]`.
    pub fn link(&self) -> String {
        format!("[[{}]]", self.title())
    }

    pub fn size(&self) -> u64 {
        self.size.unwrap_or(self.body.len() as u64)
    }

    /// Frontmatter lookup: exact key first, then case-insensitive.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.frontmatter.get(key).or_else(|| {
            self.frontmatter
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// Tags from frontmatter `tags`/`tag` and inline `#tags`, with `#`, deduplicated.
    pub fn tags(&self) -> &[String] {
        &self.derived().tags
    }

    /// Wiki link targets in the body, in order of appearance, deduplicated.
    pub fn outlinks(&self) -> &[String] {
        &self.derived().outlinks
    }

    /// Whether the note carries `tag` or one of its nested tags.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim_start_matches('#').to_lowercase();
        self.tags().iter().any(|t| {
            let t = t.trim_start_matches('#').to_lowercase();
            t == wanted || t.starts_with(&format!("{}/", wanted))
        })
    }

    /// Whether the body links to `target` (by title, name or path, ignoring case).
    pub fn links_to(&self, target: &str) -> bool {
        let target = target.trim().trim_end_matches(".md").to_lowercase();
        self.outlinks().iter().any(|link| {
            let link = link.trim_end_matches(".md").to_lowercase();
            link == target || link.rsplit('/').next() == Some(target.as_str())
        })
    }

    fn derived(&self) -> &Derived {
        self.derived.get_or_init(|| Derived {
            tags: collect_tags(self),
            outlinks: collect_outlinks(&self.body),
        })
    }
}

fn normalize_path(path: &str) -> String {
    path.trim().trim_start_matches("./").replace('\\', "/")
}

fn deserialize_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|path| normalize_path(&path))
}

fn push_unique(out: &mut Vec<String>, item: String) {
    if !item.is_empty() && !out.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
        out.push(item);
    }
}

fn collect_tags(note: &Note) -> Vec<String> {
    let mut tags = Vec::new();
    let declared = note.field("tags").or_else(|| note.field("tag"));
    let mut add = |raw: &str| {
        for part in raw.split([',', ' ']) {
            let part = part.trim().trim_start_matches('#');
            if !part.is_empty() {
                push_unique(&mut tags, format!("#{}", part));
            }
        }
    };
    match declared {
        Some(Value::String(s)) => add(s),
        Some(Value::Array(items)) => {
            for item in items {
                add(&item.render());
            }
        }
        _ => {}
    }

    let mut fences = FenceTracker::default();
    for line in note.body.lines() {
        if fences.in_code(line) {
            continue;
        }
        for capture in INLINE_TAG.captures_iter(line) {
            push_unique(&mut tags, format!("#{}", &capture[1]));
        }
    }
    tags
}

fn collect_outlinks(body: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut fences = FenceTracker::default();
    for line in body.lines() {
        if fences.in_code(line) {
            continue;
        }
        for capture in WIKI_LINK.captures_iter(line) {
            push_unique(&mut links, capture[1].trim().to_string());
        }
    }
    links
}

/// The notes a query ranges over, in canonical path order.
///
/// Sorting on construction gives queries without `SORT` a deterministic
/// order no matter how the host assembled the notes.
#[derive(Debug, Clone, Default)]
pub struct NoteCollection {
    notes: Vec<Note>,
}

impl NoteCollection {
    pub fn new(mut notes: Vec<Note>) -> Self {
        notes.sort_by(|a, b| a.path.cmp(&b.path));
        NoteCollection { notes }
    }

    /// Reads a JSON array of notes.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let notes: Vec<Note> = serde_json::from_str(json)?;
        Ok(NoteCollection::new(notes))
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, path: &str) -> Option<&Note> {
        self.notes
            .binary_search_by(|note| note.path.as_str().cmp(path))
            .ok()
            .map(|index| &self.notes[index])
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }
}

impl FromIterator<Note> for NoteCollection {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        NoteCollection::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_and_folder_from_path() {
        let note = Note::new("projects/active/alpha.md", "");
        assert_eq!(note.name(), "alpha");
        assert_eq!(note.folder(), "projects/active");
        assert_eq!(note.title(), "alpha");
        assert_eq!(note.link(), "[[alpha]]");
    }

    #[test]
    fn merges_frontmatter_and_inline_tags() {
        let note = Note::new("a.md", "Working on #area/health today\n```\n#not-a-tag\n```")
            .with_field("tags", Value::Array(vec!["work".into(), "#urgent".into()]));
        assert_eq!(note.tags(), ["#work", "#urgent", "#area/health"]);
        assert!(note.has_tag("area"));
        assert!(!note.has_tag("not-a-tag"));
    }

    #[test]
    fn collects_wiki_links() {
        let note = Note::new("a.md", "See [[Weekly Review|review]] and [[b#Heading]].");
        assert_eq!(note.outlinks(), ["Weekly Review", "b"]);
        assert!(note.links_to("weekly review"));
    }

    #[test]
    fn deserialized_paths_are_normalized() {
        let notes = NoteCollection::from_json(
            r#"[{"path": "./projects/a.md"}, {"path": "archive\\old\\b.md"}]"#,
        )
        .unwrap();
        assert_eq!(notes.get("projects/a.md").unwrap().folder(), "projects");
        assert_eq!(notes.get("archive/old/b.md").unwrap().folder(), "archive/old");
    }
}
