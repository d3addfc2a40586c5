//! Tagged value tree shared by declared definitions and observed state.
//!
//! YAML definitions and JSON state payloads are both converted into [`Value`]
//! so that normalization and comparison work over a single recursive type.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Sequence of scalars (or a mixed sequence).
    List(Vec<Value>),
    /// Non-empty sequence whose every element is a mapping, e.g. column definitions.
    Records(Vec<Record>),
    Record(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or empty string: a declared value that expresses no opinion.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_) | Value::Records(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Scalar rendered as plain text; `None` for lists, records and null.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Records(_) => "list of mappings",
            Value::Record(_) => "mapping",
        }
    }

    /// Equality that ignores the numeric representation: `1`, `1.0` and `true`
    /// are the same value. Containers compare element by element.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            (Value::Records(a), Value::Records(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| records_loosely_eq(x, y))
            }
            (Value::Record(a), Value::Record(b)) => records_loosely_eq(a, b),
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => int_eq_float(*i, *f),
            (Value::Bool(b), other) | (other, Value::Bool(b))
                if matches!(other, Value::Int(_) | Value::Float(_)) =>
            {
                Value::Int(i64::from(*b)).loosely_eq(other)
            }
            (a, b) => a == b,
        }
    }

    fn from_sequence(items: Vec<Value>) -> Value {
        let all_records = !items.is_empty() && items.iter().all(|v| matches!(v, Value::Record(_)));
        if all_records {
            Value::Records(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Record(r) => Some(r),
                        _ => None,
                    })
                    .collect(),
            )
        } else {
            Value::List(items)
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    n.as_f64().map(Value::from).unwrap_or(Value::Null)
                }
            }
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(seq) => {
                Value::from_sequence(seq.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Record(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    n.as_f64().map(Value::from).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::from_sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Record(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// Non-finite floats become the upper-case text normalization would produce
/// for them, so `NaN` compares equal to itself.
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        if f.is_finite() {
            Value::Float(f)
        } else {
            Value::String(f.to_string().to_uppercase())
        }
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::from_sequence(items)
    }
}

/// Exact integer/float equality; `i64 as f64` alone rounds above 2^53.
fn int_eq_float(i: i64, f: f64) -> bool {
    f.fract() == 0.0 && f == i as f64 && (f as i64) == i && f < 9.223_372_036_854_775_808e18
}

/// Same key set, and every value [`Value::loosely_eq`] its counterpart.
pub fn records_loosely_eq(a: &Record, b: &Record) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, value)| b.get(key).is_some_and(|other| value.loosely_eq(other)))
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Records(records) => serializer.collect_seq(records),
            Value::Record(record) => serializer.collect_map(record),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_yaml::Value::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
        }
    }
}

/// Parse a YAML (or JSON) document into a [`Record`].
pub fn record_from_yaml(content: &str) -> crate::error::Result<Record> {
    entries_from_yaml(content).map(|entries| entries.into_iter().collect())
}

/// Parse a YAML (or JSON) document whose root is a mapping, keeping the
/// top-level entries in document order.
pub fn entries_from_yaml(content: &str) -> crate::error::Result<Vec<(String, Value)>> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let value = match value {
        serde_yaml::Value::Tagged(tagged) => tagged.value,
        other => other,
    };

    match value {
        serde_yaml::Value::Mapping(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (yaml_key(k), Value::from(v)))
            .collect()),
        serde_yaml::Value::Null => Ok(Vec::new()),
        other => Err(crate::error::DbDriftError::DslParse(format!(
            "expected a mapping at the document root, found {}",
            Value::from(other).kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_of_mappings_becomes_records() {
        let value: Value = serde_yaml::from_str("[{name: a}, {name: b}]").unwrap();
        match value {
            Value::Records(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].get("name"), Some(&Value::from("a")));
            }
            other => panic!("expected records, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_mixed_sequences_stay_lists() {
        let empty: Value = serde_yaml::from_str("[]").unwrap();
        assert_eq!(empty, Value::List(vec![]));

        let mixed: Value = serde_yaml::from_str("[1, {name: a}]").unwrap();
        assert!(matches!(mixed, Value::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_json_and_yaml_agree() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"name": "t", "columns": [{"name": "c1", "nullable": 1}]}"#).unwrap();
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("name: t\ncolumns:\n  - name: c1\n    nullable: 1\n").unwrap();

        assert_eq!(Value::from(json), Value::from(yaml));
    }

    #[test]
    fn test_non_string_yaml_keys() {
        let record = record_from_yaml("1: one\ntrue: yes\n").unwrap();
        assert!(record.contains_key("1"));
        assert!(record.contains_key("true"));
    }

    #[test]
    fn test_serialize_records_as_json() {
        let record = record_from_yaml("columns:\n  - name: c1\ncomment: null\n").unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"columns":[{"name":"c1"}],"comment":null}"#);
    }

    #[test]
    fn test_root_must_be_mapping() {
        assert!(record_from_yaml("- a\n- b\n").is_err());
        assert!(record_from_yaml("").unwrap().is_empty());
    }

    #[test]
    fn test_loose_numeric_equality() {
        assert!(Value::Bool(true).loosely_eq(&Value::Int(1)));
        assert!(Value::Int(0).loosely_eq(&Value::Bool(false)));
        assert!(Value::Float(1.0).loosely_eq(&Value::Int(1)));
        assert!(!Value::Bool(true).loosely_eq(&Value::Int(2)));
        assert!(!Value::from("1").loosely_eq(&Value::Int(1)));
        assert!(Value::Null.loosely_eq(&Value::Null));

        let declared = record_from_yaml("columns:\n  - {name: id, nullable: true, default: 1.0}\n").unwrap();
        let observed = record_from_yaml("columns:\n  - {name: id, nullable: 1, default: 1}\n").unwrap();
        assert_ne!(declared, observed);
        assert!(records_loosely_eq(&declared, &observed));
    }

    #[test]
    fn test_large_int_float_equality_is_exact() {
        assert!(!Value::Int(9_007_199_254_740_993).loosely_eq(&Value::Float(9_007_199_254_740_992.0)));
        assert!(Value::Int(9_007_199_254_740_992).loosely_eq(&Value::Float(9_007_199_254_740_992.0)));
        assert!(!Value::Int(i64::MAX).loosely_eq(&Value::Float(9.223_372_036_854_775_808e18)));
        assert!(!Value::Int(1).loosely_eq(&Value::Float(1.5)));
        assert!(Value::Float(1.0).loosely_eq(&Value::Bool(true)));
    }

    #[test]
    fn test_non_finite_floats_become_text() {
        let record = record_from_yaml("ratio: .nan\nlimit: .inf\nfloor: -.inf\n").unwrap();
        assert_eq!(record.get("ratio"), Some(&Value::from("NAN")));
        assert_eq!(record.get("limit"), Some(&Value::from("INF")));
        assert_eq!(record.get("floor"), Some(&Value::from("-INF")));
        assert_eq!(record, record.clone());
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_entries_keep_document_order() {
        let entries = entries_from_yaml("table: []\ndatabase: []\nschema: []\n").unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["table", "database", "schema"]);
        assert!(entries_from_yaml("").unwrap().is_empty());
        assert!(entries_from_yaml("just text").is_err());
    }

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(!Value::from(" ").is_blank());
        assert!(!Value::Int(0).is_blank());
    }
}
