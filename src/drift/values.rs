use crate::value::{records_loosely_eq, Record, Value};
use super::state::CheckResult;

/// Compare two normalized records of identical key shape.
///
/// The diff is keyed by the declared side and only keeps what would have to be
/// applied: nested mappings are narrowed to their differing leaves, lists keep
/// the declared items missing from the observed list, and blank declared
/// leaves are never reported.
pub fn check_values(definition: &Record, state: &Record) -> CheckResult {
    if records_loosely_eq(definition, state) {
        return CheckResult::matched();
    }

    let diff = diff_records(definition, state);
    if diff.is_empty() {
        CheckResult::matched()
    } else {
        CheckResult::drifted(diff)
    }
}

fn diff_records(declared: &Record, observed: &Record) -> Record {
    let mut diff = Record::new();

    for (key, declared_value) in declared {
        let observed_value = observed.get(key).unwrap_or(&Value::Null);

        match (declared_value, observed_value) {
            (Value::Record(d), Value::Record(o)) => {
                let nested = diff_records(d, o);
                if !nested.is_empty() {
                    diff.insert(key.clone(), Value::Record(nested));
                }
            }
            (d, o) if d.is_list() && o.is_list() => {
                if let Some(missing) = missing_items(d, o) {
                    diff.insert(key.clone(), missing);
                }
            }
            (d, o) => {
                if !d.loosely_eq(o) && !d.is_blank() {
                    diff.insert(key.clone(), d.clone());
                }
            }
        }
    }

    diff
}

/// Declared list items that appear nowhere in the observed list.
///
/// Observed-only items are not reported.
fn missing_items(declared: &Value, observed: &Value) -> Option<Value> {
    match declared {
        Value::Records(records) => {
            let missing: Vec<Record> = records
                .iter()
                .filter(|record| !contains_record(observed, record))
                .cloned()
                .collect();
            (!missing.is_empty()).then_some(Value::Records(missing))
        }
        Value::List(items) => {
            let missing: Vec<Value> = items
                .iter()
                .filter(|item| !contains_item(observed, item))
                .cloned()
                .collect();
            (!missing.is_empty()).then_some(Value::List(missing))
        }
        _ => None,
    }
}

fn contains_record(list: &Value, record: &Record) -> bool {
    match list {
        Value::Records(records) => records.iter().any(|r| records_loosely_eq(r, record)),
        Value::List(items) => items
            .iter()
            .any(|item| item.as_record().is_some_and(|r| records_loosely_eq(r, record))),
        _ => false,
    }
}

fn contains_item(list: &Value, item: &Value) -> bool {
    match (list, item) {
        (Value::List(items), _) => items.iter().any(|i| i.loosely_eq(item)),
        (Value::Records(records), Value::Record(record)) => {
            records.iter().any(|r| records_loosely_eq(r, record))
        }
        _ => false,
    }
}
