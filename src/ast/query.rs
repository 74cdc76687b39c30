use std::fmt;

use serde::Serialize;

use crate::ast::{Expr, Literal, SortDirection};

/// The shape of a query, which decides what a result row is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    Table,
    List,
    Task,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Table => f.write_str("TABLE"),
            QueryType::List => f.write_str("LIST"),
            QueryType::Task => f.write_str("TASK"),
        }
    }
}

/// A TABLE column: an expression with an optional display alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Field {
    /// Column header: the alias, or the expression's source text.
    pub fn header(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.expr.to_string(),
        }
    }
}

/// A `SORT` key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// Candidate source of a `FROM` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Folder or file path prefix (`"projects/active"`)
    Folder(String),
    /// Tag, without `#`; also matches nested tags (`#area` matches `#area/health`)
    Tag(String),
    /// Notes linking to the given target (`[[Weekly Review]]`)
    Link(String),
    And(Box<Source>, Box<Source>),
    Or(Box<Source>, Box<Source>),
    Not(Box<Source>),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Folder(path) => write!(f, "\"{}\"", path),
            Source::Tag(tag) => write!(f, "#{}", tag),
            Source::Link(target) => write!(f, "[[{}]]", target),
            Source::And(left, right) => write!(f, "({} AND {})", left, right),
            Source::Or(left, right) => write!(f, "({} OR {})", left, right),
            Source::Not(inner) => write!(f, "-{}", inner),
        }
    }
}

/// A complete parsed query.
///
/// A query without `from` ranges over the entire note collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub query_type: QueryType,

    /// TABLE columns; always empty for LIST and TASK
    pub fields: Vec<Field>,

    pub from: Option<Source>,

    /// `WHERE` predicate
    pub filter: Option<Expr>,

    pub sort: Vec<SortKey>,

    /// Always positive when present
    pub limit: Option<usize>,
}

impl Query {
    /// Every top-level expression: columns, then the filter, then sort keys.
    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.fields
            .iter()
            .map(|field| &field.expr)
            .chain(self.filter.iter())
            .chain(self.sort.iter().map(|key| &key.expr))
    }
}

/// Re-renders the query in canonical form: upper-case keywords, single
/// spaces, aliases quoted.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_type)?;
        for (i, field) in self.fields.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{}", field.expr)?;
            if let Some(alias) = &field.alias {
                write!(f, " AS {}", Literal::String(alias.clone()))?;
            }
        }
        if let Some(source) = &self.from {
            write!(f, " FROM {}", source)?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        for (i, key) in self.sort.iter().enumerate() {
            f.write_str(if i == 0 { " SORT " } else { ", " })?;
            write!(f, "{} {}", key.expr, key.direction)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}
