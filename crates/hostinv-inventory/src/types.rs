//! Inventory value types

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Content mapping produced by a probe
pub type Content = Map<String, Value>;

/// Parsed instance fields, keyed by property name
pub type ParsedRecord = BTreeMap<String, ValueLiteral>;

/// One literal value from instance text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValueLiteral {
    /// `NULL`
    Null,
    /// `TRUE` / `FALSE`
    Boolean(bool),
    /// Bare, optionally negative, integer
    Integer(i64),
    /// Double-quoted string
    String(String),
    /// Brace-delimited list of scalars
    List(Vec<ValueLiteral>),
}

impl ValueLiteral {
    /// String contents, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueLiteral::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render as a mapping key (`Index = 0` groups under `"0"`)
    ///
    /// Lists have no key form.
    #[must_use]
    pub fn key_string(&self) -> Option<String> {
        match self {
            ValueLiteral::Null => Some("null".to_string()),
            ValueLiteral::Boolean(b) => Some(b.to_string()),
            ValueLiteral::Integer(n) => Some(n.to_string()),
            ValueLiteral::String(s) => Some(s.clone()),
            ValueLiteral::List(_) => None,
        }
    }
}

impl From<ValueLiteral> for Value {
    fn from(literal: ValueLiteral) -> Self {
        match literal {
            ValueLiteral::Null => Value::Null,
            ValueLiteral::Boolean(b) => Value::Bool(b),
            ValueLiteral::Integer(n) => Value::from(n),
            ValueLiteral::String(s) => Value::String(s),
            ValueLiteral::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
        }
    }
}

impl From<&str> for ValueLiteral {
    fn from(s: &str) -> Self {
        ValueLiteral::String(s.to_string())
    }
}

impl From<i64> for ValueLiteral {
    fn from(n: i64) -> Self {
        ValueLiteral::Integer(n)
    }
}

impl From<bool> for ValueLiteral {
    fn from(b: bool) -> Self {
        ValueLiteral::Boolean(b)
    }
}

/// Instance-text spelling of the value
impl fmt::Display for ValueLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLiteral::Null => write!(f, "NULL"),
            ValueLiteral::Boolean(true) => write!(f, "TRUE"),
            ValueLiteral::Boolean(false) => write!(f, "FALSE"),
            ValueLiteral::Integer(n) => write!(f, "{n}"),
            ValueLiteral::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            ValueLiteral::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Convert a parsed record into a JSON object
#[must_use]
pub fn record_to_json(record: ParsedRecord) -> Value {
    Value::Object(
        record
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serializes_untagged() {
        let value = ValueLiteral::List(vec![ValueLiteral::from("a"), ValueLiteral::Null]);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!(["a", null]));
    }

    #[test]
    fn test_json_conversion() {
        let mut record = ParsedRecord::new();
        record.insert("A".to_string(), ValueLiteral::Integer(-3));
        record.insert("B".to_string(), ValueLiteral::Boolean(false));
        assert_eq!(record_to_json(record), json!({"A": -3, "B": false}));
    }

    #[test]
    fn test_key_string() {
        assert_eq!(ValueLiteral::Integer(0).key_string().as_deref(), Some("0"));
        assert_eq!(ValueLiteral::from("CPU0").key_string().as_deref(), Some("CPU0"));
        assert_eq!(ValueLiteral::List(Vec::new()).key_string(), None);
    }

    #[test]
    fn test_display_escapes_strings() {
        let value = ValueLiteral::from(r#"say "hi" \ bye"#);
        assert_eq!(value.to_string(), r#""say \"hi\" \\ bye""#);
        assert_eq!(
            ValueLiteral::List(vec![1.into(), 2.into()]).to_string(),
            "{1, 2}"
        );
    }
}
