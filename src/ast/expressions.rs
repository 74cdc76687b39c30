use std::fmt;

use crate::ast::{CompareOp, LogicalOp};

/// A dotted field reference such as `status` or `file.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub segments: Vec<String>,
}

impl FieldPath {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        FieldPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a dotted path without validation, e.g. `"file.name"`.
    pub fn parse(path: &str) -> Self {
        FieldPath::new(path.split('.'))
    }

    /// Returns the remainder of the path when it lives under `namespace`.
    ///
    /// `file.name` in namespace `file` yields `Some(["name"])`.
    pub fn strip_namespace(&self, namespace: &str) -> Option<&[String]> {
        match self.segments.split_first() {
            Some((head, rest)) if head == namespace && !rest.is_empty() => Some(rest),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Literal values written directly in a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Expression trees are plain values: no back-references, no shared state.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field reference
    ///
    /// # Examples
    /// ```text
    /// status
    /// file.name
    /// ```
    Field(FieldPath),

    /// Literal value
    Literal(Literal),

    /// Function call, resolved by name at evaluation time
    ///
    /// # Example
    /// ```text
    /// contains(tags, "urgent")
    /// ```
    Call { name: String, args: Vec<Expr> },

    /// Comparison
    ///
    /// # Example
    /// ```text
    /// priority > 2
    /// ```
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Binary logical operation (`AND`, `OR`)
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Logical negation (`NOT x` or `!x`)
    Not(Box<Expr>),
}

impl Expr {
    pub fn field(path: &str) -> Expr {
        Expr::Field(FieldPath::parse(path))
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn integer(n: i64) -> Expr {
        Expr::Literal(Literal::Integer(n))
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Expr {
        Expr::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Expr {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Expr {
        Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr) -> Expr {
        Expr::Not(Box::new(operand))
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write_quoted(f, s),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// Renders the expression back to query source. Nested logical operations
/// are parenthesized so the output re-parses to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(path) => write!(f, "{}", path),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Comparison { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Logical { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op)?;
                write_operand(f, right)
            }
            Expr::Not(operand) => {
                f.write_str("NOT ")?;
                write_operand(f, operand)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Logical { .. } | Expr::Comparison { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}
