use std::cmp::Ordering;

use crate::{
    ast::{CompareOp, Expr, Literal, LogicalOp},
    error::EvalError,
    functions::{Function, FunctionRegistry},
    resolver::Environment,
    value::{Value, compare_numbers},
};

/// Expression evaluator.
///
/// Evaluates `WHERE` predicates, TABLE columns and sort keys against one
/// candidate's environment. Holds no state besides the function registry,
/// so one evaluator can be shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'f> {
    functions: &'f FunctionRegistry,
}

impl<'f> Evaluator<'f> {
    pub fn new(functions: &'f FunctionRegistry) -> Self {
        Evaluator { functions }
    }

    /// Evaluates an expression for one candidate.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use noteql::{Evaluator, FunctionRegistry, Value};
    ///
    /// let expr = noteql::Parser::new(noteql::Lexer::new("upper(status) = \"OPEN\""))
    ///     .unwrap()
    ///     .parse()
    ///     .unwrap();
    /// let mut env = BTreeMap::new();
    /// env.insert("status".to_string(), Value::from("open"));
    ///
    /// let functions = FunctionRegistry::default();
    /// let result = Evaluator::new(&functions).eval_expr(&expr, &env).unwrap();
    /// assert_eq!(result, Value::Boolean(true));
    /// ```
    pub fn eval_expr<E>(&self, expr: &Expr, env: &E) -> Result<Value, EvalError>
    where
        E: Environment + ?Sized,
    {
        match expr {
            Expr::Field(path) => Ok(env.lookup(path)),
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Call { name, args } => self.eval_call(expr, name, args, env),
            Expr::Comparison { op, left, right } => {
                let left_val = self.eval_expr(left, env)?;
                let right_val = self.eval_expr(right, env)?;
                compare(*op, &left_val, &right_val)
                    .map(Value::Boolean)
                    .map_err(|e| e.in_expr(expr))
            }
            Expr::Logical { op, left, right } => {
                // Short-circuit left to right
                let left_val = self.eval_expr(left, env)?.is_truthy();
                let result = match op {
                    LogicalOp::And if !left_val => false,
                    LogicalOp::Or if left_val => true,
                    _ => self.eval_expr(right, env)?.is_truthy(),
                };
                Ok(Value::Boolean(result))
            }
            Expr::Not(operand) => Ok(Value::Boolean(!self.eval_expr(operand, env)?.is_truthy())),
        }
    }

    /// Evaluates a predicate to its truthiness.
    pub fn matches<E>(&self, expr: &Expr, env: &E) -> Result<bool, EvalError>
    where
        E: Environment + ?Sized,
    {
        self.eval_expr(expr, env).map(|value| value.is_truthy())
    }

    /// Verifies that every call in `expr` names a registered function with
    /// the right number of arguments.
    pub fn check_calls(&self, expr: &Expr) -> Result<(), EvalError> {
        match expr {
            Expr::Field(_) | Expr::Literal(_) => Ok(()),
            Expr::Call { name, args } => {
                self.lookup_function(expr, name, args.len())?;
                args.iter().try_for_each(|arg| self.check_calls(arg))
            }
            Expr::Comparison { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.check_calls(left)?;
                self.check_calls(right)
            }
            Expr::Not(operand) => self.check_calls(operand),
        }
    }

    fn lookup_function(
        &self,
        expr: &Expr,
        name: &str,
        arg_count: usize,
    ) -> Result<&'f Function, EvalError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction {
                name: name.to_string(),
                expr: expr.to_string(),
            })?;

        if function.arity() != arg_count {
            return Err(EvalError::Arity {
                name: function.name().to_string(),
                expected: function.arity(),
                found: arg_count,
                expr: expr.to_string(),
            });
        }
        Ok(function)
    }

    fn eval_call<E>(
        &self,
        expr: &Expr,
        name: &str,
        args: &[Expr],
        env: &E,
    ) -> Result<Value, EvalError>
    where
        E: Environment + ?Sized,
    {
        let function = self.lookup_function(expr, name, args.len())?;

        let values = args
            .iter()
            .map(|arg| self.eval_expr(arg, env))
            .collect::<Result<Vec<_>, _>>()?;

        function.call(&values).map_err(|e| e.in_expr(expr))
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Integer(n) => Value::Integer(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
    }
}

/// Applies a comparison operator.
///
/// Equality never fails. Ordering operators return false when either side
/// is absent or null, and fail when the two sides cannot be brought to a
/// common type.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordering = match op {
        CompareOp::Equal => return Ok(left.loosely_equals(right)),
        CompareOp::NotEqual => return Ok(!left.loosely_equals(right)),
        _ if left.is_missing() || right.is_missing() => return Ok(false),
        _ => order(left, right)?,
    };

    Ok(match op {
        CompareOp::LessThan => ordering == Ordering::Less,
        CompareOp::GreaterThan => ordering == Ordering::Greater,
        CompareOp::LessEqual => ordering != Ordering::Greater,
        CompareOp::GreaterEqual => ordering != Ordering::Less,
        CompareOp::Equal => ordering == Ordering::Equal,
        CompareOp::NotEqual => ordering != Ordering::Equal,
    })
}

fn order(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    let mismatch = || EvalError::Coercion {
        left: describe(left),
        right: describe(right),
        expr: String::new(),
    };

    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
        (a, b) if a.is_number() || b.is_number() => {
            if is_numeric(a) && is_numeric(b) {
                Ok(compare_numbers(a, b))
            } else {
                Err(mismatch())
            }
        }
        (Value::Date(_), _) | (_, Value::Date(_)) => match (left.to_date(), right.to_date()) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => Err(mismatch()),
        },
        (Value::Array(_), Value::Array(_)) => Ok(left.sort_cmp(right)),
        _ => Err(mismatch()),
    }
}

fn is_numeric(value: &Value) -> bool {
    value.is_number() || value.to_decimal().is_some()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Absent | Value::Null => value.type_name().to_string(),
        other => format!("{} {}", other.type_name(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_never_equal() {
        assert!(!compare(CompareOp::Equal, &Value::Absent, &"x".into()).unwrap());
        assert!(compare(CompareOp::NotEqual, &Value::Absent, &"x".into()).unwrap());
        assert!(!compare(CompareOp::GreaterThan, &Value::Absent, &Value::Integer(1)).unwrap());
    }

    #[test]
    fn numeric_text_coerces_for_ordering() {
        assert!(compare(CompareOp::GreaterThan, &"10".into(), &Value::Integer(9)).unwrap());
        assert!(compare(CompareOp::LessThan, &"abc".into(), &Value::Integer(9)).is_err());
    }
}
