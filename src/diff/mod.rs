use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use crate::drift::flatten_keys;
use crate::value::Record;

/// YAML rendering of a normalized record, keys in sorted order.
pub fn render_record(record: &Record) -> String {
    if record.is_empty() {
        return String::new();
    }
    serde_yaml::to_string(record).unwrap_or_default()
}

/// Line diff from the observed state to the declared definition.
///
/// A resource that does not exist yet renders as all insertions.
pub fn format_value_diff(observed: Option<&Record>, declared: &Record) -> String {
    let old = observed.map(render_record).unwrap_or_default();
    let new = render_record(declared);
    let diff = TextDiff::from_lines(&old, &new);
    let mut output = String::new();

    output.push_str(&"───────────────────────────────────────\n".dimmed().to_string());

    for change in diff.iter_all_changes() {
        let line = change.to_string();
        let formatted = match change.tag() {
            ChangeTag::Delete => format!("- {}", line.trim_end()).red().to_string(),
            ChangeTag::Insert => format!("+ {}", line.trim_end()).green().to_string(),
            ChangeTag::Equal => format!("  {}", line.trim_end()),
        };
        output.push_str(&formatted);
        output.push('\n');
    }

    output.push_str(&"───────────────────────────────────────".dimmed().to_string());

    output
}

/// Flattened key paths touched by an `alter` diff.
pub fn changed_paths(diff: &Record) -> Vec<String> {
    flatten_keys(diff).into_iter().collect()
}
