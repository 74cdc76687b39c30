//! Function registry for calls in query expressions.
//!
//! Functions are looked up by name when a call is evaluated, never when it is
//! parsed, so hosts can register their own without touching the parser or
//! the evaluator.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{error::EvalError, value::Value};

type FunctionBody = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A callable with a fixed arity.
#[derive(Clone)]
pub struct Function {
    name: String,
    arity: usize,
    body: Arc<FunctionBody>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invokes the function; a wrong argument count is an `Arity` error.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.arity {
            return Err(EvalError::Arity {
                name: self.name.clone(),
                expected: self.arity,
                found: args.len(),
                expr: String::new(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Name to function mapping. Names are case-insensitive.
///
/// [`FunctionRegistry::default`] holds the built-ins; [`FunctionRegistry::new`]
/// starts empty.
///
/// # Examples
///
/// ```
/// use noteql::{FunctionRegistry, Value};
///
/// let mut functions = FunctionRegistry::default();
/// functions.register("double", 1, |args| match &args[0] {
///     Value::Integer(n) => Ok(Value::Integer(n * 2)),
///     other => Err(noteql::EvalError::type_error(format!(
///         "double() expects an integer, got {}",
///         other.type_name()
///     ))),
/// });
/// assert!(functions.get("DOUBLE").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = FunctionRegistry::new();
        registry.register("contains", 2, builtin_contains);
        registry.register("length", 1, builtin_length);
        registry.register("lower", 1, |args| map_string("lower", &args[0], str::to_lowercase));
        registry.register("upper", 1, |args| map_string("upper", &args[0], str::to_uppercase));
        registry.register("startswith", 2, |args| {
            test_strings("startswith", &args[0], &args[1], |s, p| s.starts_with(p))
        });
        registry.register("endswith", 2, |args| {
            test_strings("endswith", &args[0], &args[1], |s, p| s.ends_with(p))
        });
        registry.register("default", 2, |args| {
            Ok(if args[0].is_missing() {
                args[1].clone()
            } else {
                args[0].clone()
            })
        });
        registry
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
        }
    }

    /// Adds or replaces a function.
    pub fn register<F>(&mut self, name: &str, arity: usize, body: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        self.functions.insert(
            name.clone(),
            Function {
                name,
                arity,
                body: Arc::new(body),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn builtin_contains(args: &[Value]) -> Result<Value, EvalError> {
    let (haystack, needle) = (&args[0], &args[1]);
    let found = match haystack {
        Value::Absent | Value::Null => false,
        Value::Array(items) => items.iter().any(|item| item.loosely_equals(needle)),
        Value::String(s) => match needle {
            Value::String(n) => s.contains(n.as_str()),
            Value::Absent | Value::Null => false,
            other if other.is_number() => s.contains(&other.render()),
            other => {
                return Err(EvalError::type_error(format!(
                    "contains() cannot search a string for {}",
                    other.type_name()
                )));
            }
        },
        other => {
            return Err(EvalError::type_error(format!(
                "contains() expects a string or array, got {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::Boolean(found))
}

fn builtin_length(args: &[Value]) -> Result<Value, EvalError> {
    let len = match &args[0] {
        Value::Absent | Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        other => {
            return Err(EvalError::type_error(format!(
                "length() expects a string or array, got {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::Integer(len as i64))
}

fn map_string(name: &str, value: &Value, f: fn(&str) -> String) -> Result<Value, EvalError> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        missing if missing.is_missing() => Ok(missing.clone()),
        other => Err(EvalError::type_error(format!(
            "{}() expects a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn test_strings(
    name: &str,
    subject: &Value,
    pattern: &Value,
    test: fn(&str, &str) -> bool,
) -> Result<Value, EvalError> {
    match (subject, pattern) {
        (Value::String(s), Value::String(p)) => Ok(Value::Boolean(test(s, p))),
        (s, _) if s.is_missing() => Ok(Value::Boolean(false)),
        (s, p) => Err(EvalError::type_error(format!(
            "{}() expects two strings, got {} and {}",
            name,
            s.type_name(),
            p.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        FunctionRegistry::default()
            .get(name)
            .expect("builtin")
            .call(args)
    }

    #[test]
    fn contains_searches_strings_and_arrays() {
        let tags = Value::Array(vec!["#work".into(), "#home".into()]);
        assert_eq!(call("contains", &[tags, "#home".into()]).unwrap(), Value::Boolean(true));
        assert_eq!(
            call("contains", &["milestone".into(), "stone".into()]).unwrap(),
            Value::Boolean(true)
        );
        assert!(call("contains", &[Value::Integer(3), "3".into()]).is_err());
    }

    #[test]
    fn case_functions_reject_numbers() {
        assert_eq!(call("upper", &["ok".into()]).unwrap(), Value::String("OK".into()));
        assert_eq!(call("lower", &[Value::Absent]).unwrap(), Value::Absent);
        assert!(call("lower", &[Value::Integer(1)]).is_err());
    }

    #[test]
    fn direct_calls_check_arity() {
        match call("startswith", &["alpha".into()]) {
            Err(EvalError::Arity { name, expected, found, .. }) => {
                assert_eq!((name.as_str(), expected, found), ("startswith", 2, 1));
            }
            other => panic!("Expected arity error, got {:?}", other),
        }
        assert!(matches!(call("default", &[]), Err(EvalError::Arity { .. })));
    }
}
