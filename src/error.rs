//! Error taxonomy shared by every stage of query processing.
//!
//! Three tiers: [`SyntaxError`] from the lexer and parser, [`EvalError`] from
//! evaluation, and an unexpected tier for anything else caught at the block
//! boundary. [`QueryError`] unifies them for callers that only need to report.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ast::Position;

/// Lexing or parsing failure, fatal to the query block it occurred in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {position}")]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
    /// Token kinds that would have been accepted, if known
    pub expected: Vec<String>,
    /// The offending token or character, if any
    pub found: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        SyntaxError {
            message: message.into(),
            position,
            expected: Vec::new(),
            found: None,
        }
    }

    /// Builds the usual "expected X, found Y" error.
    pub fn expected(expected: &[&str], found: impl Into<String>, position: Position) -> Self {
        let found = found.into();
        let message = match expected {
            [] => format!("Unexpected {}", found),
            [one] => format!("Expected {}, found {}", one, found),
            many => format!("Expected one of {}, found {}", many.join(", "), found),
        };
        SyntaxError {
            message,
            position,
            expected: expected.iter().map(|s| s.to_string()).collect(),
            found: Some(found),
        }
    }
}

/// Errors that can occur while evaluating an expression against one candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Call to a name that is not in the function registry
    #[error("Unknown function '{name}' in `{expr}`")]
    UnknownFunction { name: String, expr: String },

    /// Function called with the wrong number of arguments
    #[error("Function '{name}' expects {expected} argument(s), got {found} in `{expr}`")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
        expr: String,
    },

    /// Type mismatch or invalid operation for the given type
    #[error("Type error in `{expr}`: {message}")]
    Type { message: String, expr: String },

    /// A value could not be coerced to a number or date for ordering
    #[error("Cannot compare {left} with {right} in `{expr}`")]
    Coercion {
        left: String,
        right: String,
        expr: String,
    },
}

impl EvalError {
    /// Type error not yet attached to an expression; see [`EvalError::in_expr`].
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type {
            message: message.into(),
            expr: String::new(),
        }
    }

    /// Attaches the offending sub-expression if none is recorded yet.
    pub fn in_expr(self, source: &impl fmt::Display) -> Self {
        let fill = |expr: String| {
            if expr.is_empty() {
                source.to_string()
            } else {
                expr
            }
        };
        match self {
            EvalError::UnknownFunction { name, expr } => EvalError::UnknownFunction {
                name,
                expr: fill(expr),
            },
            EvalError::Arity {
                name,
                expected,
                found,
                expr,
            } => EvalError::Arity {
                name,
                expected,
                found,
                expr: fill(expr),
            },
            EvalError::Type { message, expr } => EvalError::Type {
                message,
                expr: fill(expr),
            },
            EvalError::Coercion { left, right, expr } => EvalError::Coercion {
                left,
                right,
                expr: fill(expr),
            },
        }
    }
}

/// Machine-readable error kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Syntax,
    Execution,
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => f.write_str("syntax"),
            ErrorKind::Execution => f.write_str("execution"),
            ErrorKind::Unexpected => f.write_str("unexpected"),
        }
    }
}

/// Any failure of one query block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Execution error: {0}")]
    Execution(#[from] EvalError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Syntax(_) => ErrorKind::Syntax,
            QueryError::Execution(_) => ErrorKind::Execution,
            QueryError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Message without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            QueryError::Syntax(e) => e.to_string(),
            QueryError::Execution(e) => e.to_string(),
            QueryError::Unexpected(msg) => msg.clone(),
        }
    }
}
