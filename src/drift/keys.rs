use std::collections::BTreeSet;
use crate::error::{DbDriftError, Result};
use crate::value::{Record, Value};
use super::state::CheckResult;

pub const PATH_SEPARATOR: &str = "::";

/// Flatten a record into `parent::child` key paths.
///
/// Lists of mappings contribute the paths of their first element only: the
/// declared and observed sides may hold a different number of items, so only
/// the item shape takes part in the comparison.
pub fn flatten_keys(record: &Record) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect_paths(None, record, &mut paths);
    paths
}

fn collect_paths(prefix: Option<&str>, record: &Record, paths: &mut BTreeSet<String>) {
    for (key, value) in record {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };

        match value {
            Value::Record(inner) if !inner.is_empty() => collect_paths(Some(&path), inner, paths),
            Value::Records(items) => match items.first() {
                Some(first) if !first.is_empty() => collect_paths(Some(&path), first, paths),
                _ => {
                    paths.insert(path);
                }
            },
            _ => {
                paths.insert(path);
            }
        }
    }
}

/// Verify both sides expose the same key paths.
///
/// A mismatch means the declaration and the live object disagree on shape
/// (renamed or added property), which a value diff cannot express.
pub fn check_keys(definition: &Record, state: &Record, name: &str) -> Result<CheckResult> {
    let declared = flatten_keys(definition);
    let observed = flatten_keys(state);

    // BTreeSet yields the difference in ascending order
    let mismatched: Vec<String> = declared.symmetric_difference(&observed).cloned().collect();

    if mismatched.is_empty() {
        Ok(CheckResult::matched())
    } else {
        Err(DbDriftError::StructuralDrift {
            name: name.to_string(),
            keys: mismatched,
        })
    }
}
