mod state_error;

use std::collections::BTreeMap;
use thiserror::Error;

pub use state_error::StateFetchError;

/// Snapshot of a dependency graph attached to ordering errors.
pub type GraphSnapshot = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum DbDriftError {
    #[error("{}", definition_key_message(.keys, .file.as_deref(), .name.as_deref()))]
    DefinitionKey {
        keys: Vec<String>,
        file: Option<String>,
        name: Option<String>,
    },

    #[error(
        "Invalid or missing definition variables for the resource: '{name}'.\nVariables: {}",
        bullet_list(.keys)
    )]
    StructuralDrift { name: String, keys: Vec<String> },

    #[error(
        "There is an incorrect dependency in the map:\n{}\nUnknown resources: {}. Make sure the objects names are correct.",
        format_graph(.graph),
        .missing.join(", ")
    )]
    DependencyReference {
        missing: Vec<String>,
        graph: GraphSnapshot,
    },

    #[error(
        "There is a cyclical dependency in the map:\n{}\nUnresolved resources: {}",
        format_graph(.graph),
        .unresolved.join(", ")
    )]
    CyclicalDependency {
        unresolved: Vec<String>,
        graph: GraphSnapshot,
    },

    #[error("Resource '{id}' is declared more than once (in {})", .files.join(", "))]
    DuplicateResource { id: String, files: Vec<String> },

    #[error("Failed to fetch the state of '{resource}': {source}")]
    StateFetch {
        resource: String,
        #[source]
        source: StateFetchError,
    },

    #[error("Definition parse error: {0}")]
    DslParse(String),

    #[error("YAML file not found: {0}")]
    YamlFileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbDriftError {
    pub fn missing_key(key: &str, file: Option<&str>, name: Option<&str>) -> Self {
        DbDriftError::DefinitionKey {
            keys: vec![key.to_string()],
            file: file.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, DbDriftError::StructuralDrift { .. })
    }

    /// Resource the error is attached to, when there is exactly one.
    pub fn resource(&self) -> Option<&str> {
        match self {
            DbDriftError::DefinitionKey { name, .. } => name.as_deref(),
            DbDriftError::StructuralDrift { name, .. } => Some(name),
            DbDriftError::DuplicateResource { id, .. } => Some(id),
            DbDriftError::StateFetch { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

fn definition_key_message(keys: &[String], file: Option<&str>, name: Option<&str>) -> String {
    let keys = keys.join("', '");
    match (file, name) {
        (Some(file), Some(name)) => format!(
            "Invalid or missing keys: ['{keys}'] for the object name = '{name}' in the file = '{file}'."
        ),
        (Some(file), None) => format!("Invalid or missing keys: ['{keys}'] in the file = '{file}'."),
        (None, Some(name)) => format!("Invalid or missing keys: ['{keys}'] for the object name = '{name}'."),
        (None, None) => format!(
            "One of the definitions yaml files has invalid or missing keys: '{keys}'."
        ),
    }
}

fn bullet_list(keys: &[String]) -> String {
    keys.iter().map(|k| format!("\n- {k}")).collect()
}

fn format_graph(graph: &GraphSnapshot) -> String {
    serde_json::to_string_pretty(graph).unwrap_or_else(|_| format!("{graph:?}"))
}

pub type Result<T> = std::result::Result<T, DbDriftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_drift_message() {
        let err = DbDriftError::StructuralDrift {
            name: "table".to_string(),
            keys: vec!["columns::default".to_string(), "wrong_extra".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "Invalid or missing definition variables for the resource: 'table'.\nVariables: \n- columns::default\n- wrong_extra"
        );
        assert!(err.is_structural());
    }

    #[test]
    fn test_definition_key_message_variants() {
        let err = DbDriftError::missing_key("depends_on", Some("schema.yml"), Some("raw"));
        assert_eq!(
            err.to_string(),
            "Invalid or missing keys: ['depends_on'] for the object name = 'raw' in the file = 'schema.yml'."
        );
        assert_eq!(err.resource(), Some("raw"));

        let err = DbDriftError::missing_key("name", Some("schema.yml"), None);
        assert!(err.to_string().ends_with("in the file = 'schema.yml'."));
    }

    #[test]
    fn test_cycle_message_includes_graph() {
        let graph = GraphSnapshot::from([
            ("a::x".to_string(), vec!["b::y".to_string()]),
            ("b::y".to_string(), vec!["a::x".to_string()]),
        ]);
        let err = DbDriftError::CyclicalDependency {
            unresolved: vec!["a::x".to_string(), "b::y".to_string()],
            graph,
        };

        let message = err.to_string();
        assert!(message.contains("\"a::x\""));
        assert!(message.contains("Unresolved resources: a::x, b::y"));
    }
}
