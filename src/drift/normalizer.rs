use crate::value::{Record, Value};

/// Keys that only steer the pipeline and never describe the resource itself.
pub const PIPELINE_KEYS: &[&str] = &["depends_on", "wait_time"];

/// Canonicalizes declared and observed records so they can be compared key by key.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pipeline_keys: Vec<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            pipeline_keys: PIPELINE_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_pipeline_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            pipeline_keys: keys.into_iter().map(|k| normalize_key(k.as_ref())).collect(),
        }
    }

    pub fn pipeline_keys(&self) -> &[String] {
        &self.pipeline_keys
    }

    /// Keys that collide after trimming and lower-casing keep the value of the
    /// last raw key in sorted order.
    pub fn normalize(&self, raw: &Record) -> Record {
        raw.iter()
            .map(|(key, value)| (normalize_key(key), value))
            .filter(|(key, _)| !self.pipeline_keys.contains(key))
            .map(|(key, value)| (key, normalize_value(value)))
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => classify(s),
        Value::List(items) => Value::List(items.iter().map(normalize_value).collect()),
        Value::Records(records) => Value::Records(records.iter().map(normalize_record).collect()),
        Value::Record(record) => Value::Record(normalize_record(record)),
        Value::Float(f) => Value::from(*f),
        Value::Null | Value::Bool(_) | Value::Int(_) => value.clone(),
    }
}

fn normalize_record(record: &Record) -> Record {
    record
        .iter()
        .map(|(key, value)| (normalize_key(key), normalize_value(value)))
        .collect()
}

/// Trim and upper-case a string, then read it as a boolean, integer or float
/// when it looks like one.
pub fn classify(raw: &str) -> Value {
    let text = raw.trim().to_uppercase();

    match text.as_str() {
        "TRUE" => return Value::Bool(true),
        "FALSE" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }

    // "NAN"/"INF" parse as floats but must stay strings to keep equality reflexive
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }

    Value::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record_from_yaml;

    #[test]
    fn test_classify_scalars() {
        assert_eq!(classify("True"), Value::Bool(true));
        assert_eq!(classify(" false "), Value::Bool(false));
        assert_eq!(classify("0"), Value::Int(0));
        assert_eq!(classify("-1"), Value::Int(-1));
        assert_eq!(classify("1.2"), Value::Float(1.2));
        assert_eq!(classify(" Sysadmin "), Value::from("SYSADMIN"));
        assert_eq!(classify("nan"), Value::from("NAN"));
        assert_eq!(classify("inf"), Value::from("INF"));
        assert_eq!(classify(""), Value::from(""));
    }

    #[test]
    fn test_normalize_definition() {
        let raw = record_from_yaml(
            r#"
Name: example_table
DATABASE: " Example_Database"
schema: "EXAMPLE_SCHEMA "
" owner": " Sysadmin "
comment: "THIS IS A TABLE COMMENT\nTHIS IS THE NEXT LINE"
depends_on:
  schema: [example_schema]
wait_time: 10
columns:
  - Name: COLUMN1
    type: VARCHAR
    " nullable": "True"
    default: "1.2"
    COMMENT: COLUMN 1 DESCRIPTION
  - name: COLUMN3
    type: string
    nullable: "false"
    default: -1
    comment: COLUMN 1 DESCRIPTION
  - name: COLUMN4
    type: Int
    nullable: false
    default: "0"
    comment: COLUMN 2 DESCRIPTION
"#,
        )
        .unwrap();

        let expected = record_from_yaml(
            r#"
name: EXAMPLE_TABLE
database: EXAMPLE_DATABASE
schema: EXAMPLE_SCHEMA
owner: SYSADMIN
comment: "THIS IS A TABLE COMMENT\nTHIS IS THE NEXT LINE"
columns:
  - name: COLUMN1
    type: VARCHAR
    nullable: true
    default: 1.2
    comment: COLUMN 1 DESCRIPTION
  - name: COLUMN3
    type: STRING
    nullable: false
    default: -1
    comment: COLUMN 1 DESCRIPTION
  - name: COLUMN4
    type: INT
    nullable: false
    default: 0
    comment: COLUMN 2 DESCRIPTION
"#,
        )
        .unwrap();

        assert_eq!(Normalizer::new().normalize(&raw), expected);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = record_from_yaml(
            r#"
name: " Mixed_Case "
enabled: "TRUE"
retention: "7"
ratio: "0.25"
tags: [" a ", "1", "false", null]
comment: null
options:
  " Nested ": " value "
"#,
        )
        .unwrap();

        let normalizer = Normalizer::new();
        let once = normalizer.normalize(&raw);
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice);
        assert_eq!(once.get("comment"), Some(&Value::Null));
        assert_eq!(
            once.get("tags"),
            Some(&Value::List(vec![
                Value::from("A"),
                Value::Int(1),
                Value::Bool(false),
                Value::Null
            ]))
        );
    }

    #[test]
    fn test_pipeline_keys_only_stripped_at_top_level() {
        let raw = record_from_yaml(
            "name: t\n\" Depends_On \": {}\noptions:\n  wait_time: 5\n",
        )
        .unwrap();

        let normalized = Normalizer::new().normalize(&raw);
        assert!(!normalized.contains_key("depends_on"));
        let options = normalized.get("options").and_then(Value::as_record).unwrap();
        assert_eq!(options.get("wait_time"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_custom_pipeline_keys() {
        let raw = record_from_yaml("name: t\nobject_id_tag: abc\ndepends_on: {}\n").unwrap();
        let normalizer = Normalizer::with_pipeline_keys(["OBJECT_ID_TAG"]);
        let normalized = normalizer.normalize(&raw);

        assert!(!normalized.contains_key("object_id_tag"));
        assert!(normalized.contains_key("depends_on"));
    }

    #[test]
    fn test_colliding_keys_keep_last_sorted_value() {
        let raw = record_from_yaml("\" owner\": first\nOwner: second\n").unwrap();
        let normalized = Normalizer::new().normalize(&raw);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized.get("owner"), Some(&Value::from("SECOND")));
    }
}
