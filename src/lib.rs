pub mod ast;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod functions;
pub mod lexer;
pub mod note;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod tasks;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Expr, FieldPath, Position, Query, QueryType, Source, Token};
pub use config::{ConfigError, EngineConfig};
pub use detector::{BlockKind, Detector, QueryBlock};
pub use engine::{BlockOutcome, DocumentReport, Engine};
pub use error::{ErrorKind, EvalError, QueryError, SyntaxError};
pub use evaluator::Evaluator;
pub use executor::{ExecutionResult, Executor, ResultRows};
pub use functions::{Function, FunctionRegistry};
pub use lexer::Lexer;
pub use note::{Note, NoteCollection};
pub use output::{MarkdownRenderer, QuerySummary, to_json, to_json_pretty};
pub use parser::{Parser, parse_query};
pub use tasks::{TaskRecord, extract_tasks};
pub use value::Value;
