use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};

/// A field value as seen by the query evaluator.
///
/// This is a closed union: frontmatter arrives as arbitrary JSON and is
/// narrowed into these variants, so every comparison and coercion rule can
/// be matched exhaustively.
///
/// # Absent vs Null
///
/// `Absent` means the note has no such field at all. `Null` is an explicit
/// null, either written in frontmatter or as the `null` literal. Equality
/// against `Absent` is always false; equality between two nulls is true.
///
/// # Examples
///
/// ```
/// use noteql::Value;
///
/// let tags = Value::from(serde_json::json!(["work", "urgent"]));
/// assert_eq!(
///     tags,
///     Value::Array(vec![Value::String("work".into()), Value::String("urgent".into())])
/// );
/// assert!(tags.is_truthy());
/// assert!(!Value::Absent.is_truthy());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// The field does not exist
    Absent,

    /// Explicit null
    Null,

    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    Float(f64),

    String(String),

    /// Timestamp, used for `file.ctime`, `file.mtime` and task dates
    Date(DateTime<Utc>),

    Array(Vec<Value>),
}

impl Value {
    /// Truthiness used by `WHERE`, `AND`, `OR` and `NOT`.
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Absent | Null => false,
            Boolean(b) => *b,
            Integer(n) => *n != 0,
            Float(n) => *n != 0.0 && !n.is_nan(),
            String(s) => !s.is_empty(),
            Date(_) => true,
            Array(arr) => !arr.is_empty(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Absent or explicit null.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Absent | Value::Null)
    }

    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
        }
    }

    /// Numeric view of the value. Strings holding decimal text coerce.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::from_f64(*n),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Float view of numeric values only; strings do not coerce.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Date view of the value. Strings in ISO form coerce.
    pub fn to_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            Value::String(s) => parse_date(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Plain-text rendering used in table cells and by string functions.
    ///
    /// Absent and null render as the empty string; arrays are comma-joined.
    pub fn render(&self) -> String {
        match self {
            Value::Absent | Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) => format_date(d),
            Value::Array(items) => items
                .iter()
                .map(Value::render)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Equality used by `=`, `!=` and `contains` on arrays.
    ///
    /// Absent never equals anything, not even another absent value. Numbers
    /// equal numeric strings with the same value; dates equal ISO date text.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Absent, _) | (_, Value::Absent) => false,
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (a, b) if a.is_number() || b.is_number() => match (a.to_decimal(), b.to_decimal()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
            (Value::Date(_), _) | (_, Value::Date(_)) => {
                matches!((self.to_date(), other.to_date()), (Some(x), Some(y)) if x == y)
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            _ => false,
        }
    }

    /// Total order used by `SORT`.
    ///
    /// Values of different kinds order by kind (missing, boolean, number,
    /// date, string, array); numbers compare numerically, strings ordinally,
    /// arrays lexicographically.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (a, b) if a.is_number() && b.is_number() => compare_numbers(a, b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.sort_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Absent | Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Date(_) => 3,
            Value::String(_) => 4,
            Value::Array(_) => 5,
        }
    }
}

/// Numeric ordering of two values that both have a numeric view.
///
/// Decimal text compares exactly; values outside the decimal range fall back
/// to floating point.
pub fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.to_decimal(), b.to_decimal()) {
        return x.cmp(&y);
    }
    let x = a.as_float().unwrap_or(f64::NAN);
    let y = b.as_float().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or RFC 3339 text as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Dates at midnight render as `YYYY-MM-DD`, others with minutes.
pub fn format_date(date: &DateTime<Utc>) -> String {
    if date.time() == chrono::NaiveTime::MIN {
        date.format("%Y-%m-%d").to_string()
    } else {
        date.format("%Y-%m-%d %H:%M").to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => f.write_str("<absent>"),
            Value::Null => f.write_str("null"),
            Value::String(s) => write!(f, "\"{}\"", s),
            other => f.write_str(&other.render()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            // Nested maps have no counterpart; keep their compact JSON text
            obj @ serde_json::Value::Object(_) => Value::String(obj.to_string()),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Absent | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_compare_as_numbers() {
        let a = Value::String("10".into());
        let b = Value::Integer(9);
        assert_eq!(compare_numbers(&a, &b), Ordering::Greater);
    }

    #[test]
    fn parses_plain_dates_at_midnight() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!(format_date(&d), "2024-03-01");
        assert!(parse_date("next tuesday").is_none());
    }

    #[test]
    fn sort_puts_missing_values_first() {
        assert_eq!(Value::Absent.sort_cmp(&Value::Integer(1)), Ordering::Less);
        assert_eq!(Value::Integer(2).sort_cmp(&Value::Float(1.5)), Ordering::Greater);
    }
}
