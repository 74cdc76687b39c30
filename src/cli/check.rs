//! Validate query syntax without running it

use serde::Serialize;

use super::CliError;
use crate::{
    ast::QueryType, error::QueryError, evaluator::Evaluator, functions::FunctionRegistry, parser,
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query to validate
    pub query: String,
    /// Also verify that every called function exists with the right arity
    pub functions: bool,
}

/// Result of a successful check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub query_type: QueryType,
    /// The query re-rendered in canonical form
    pub canonical: String,
}

/// Parses the query and optionally resolves its function calls.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let query = parser::parse_query(&options.query)?;

    if options.functions {
        let registry = FunctionRegistry::default();
        let evaluator = Evaluator::new(&registry);
        for expr in query.expressions() {
            evaluator.check_calls(expr).map_err(QueryError::from)?;
        }
    }

    Ok(CheckResult {
        query_type: query.query_type,
        canonical: query.to_string(),
    })
}
