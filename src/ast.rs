//! # Note Query Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the note query
//! language, a small declarative language embedded in markdown notes as
//! fenced `dataview` blocks.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (field references, literals, calls, comparisons)
//! - **[operators]** - Comparison and logical operators, sort directions
//! - **[query]** - Complete query structure (type, fields, source, filter, sort, limit)
//!
//! ## Quick Start
//!
//! ```text
//! TABLE file.name, status FROM "projects" WHERE status = "active" SORT priority DESC LIMIT 10
//! ```
//!
//! This query lists active notes under `projects/`, highest priority first.
//!
//! ## Query Shapes
//!
//! - **TABLE** `TABLE a, b AS "B"` - one row per note, one column per field
//! - **LIST** `LIST` - one link per note
//! - **TASK** `TASK` - one checkbox per task found in the notes' bodies
//!
//! ## Clauses
//!
//! Clauses follow the query type in a fixed order, each optional:
//!
//! ```text
//! FROM source  WHERE expr  SORT expr [ASC|DESC], ...  LIMIT n
//! ```
//!
//! ### Sources
//!
//! ```text
//! FROM "projects"                 // folder prefix
//! FROM #area/health               // tag, including nested tags
//! FROM [[Weekly Review]]          // notes linking to a note
//! FROM #work AND -"archive"       // combinations
//! ```
//!
//! ### Expression Precedence
//!
//! Lowest to highest: `OR`, `AND`, `NOT`, comparison, atoms. So
//!
//! ```text
//! a = 1 AND b = 2 OR c = 3
//! ```
//!
//! parses as `(a = 1 AND b = 2) OR (c = 3)`.
pub mod expressions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use expressions::{Expr, FieldPath, Literal};
pub use operators::{CompareOp, LogicalOp, SortDirection};
pub use query::{Field, Query, QueryType, SortKey, Source};
pub use tokens::{Keyword, Position, SpannedToken, Token};
