use std::collections::{HashMap, HashSet};
use regex::Regex;
use super::parser::{DefinitionSet, ResourceDefinition, DEPENDS_ON_KEY, OBJECT_ID_TAG_KEY};
use crate::graph::{sort, DependencyGraph};
use crate::drift::normalize_key;
use crate::error::DbDriftError;
use crate::value::{Record, Value};

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub definitions: usize,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub code: &'static str,
    pub resource: String,
    pub message: String,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub struct DefinitionValidator;

impl DefinitionValidator {
    pub fn validate(definitions: &DefinitionSet) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        Self::check_depends_on_present(definitions, &mut errors);
        Self::check_duplicate_ids(definitions, &mut errors);
        Self::check_dependency_targets(definitions, &mut errors);
        Self::check_self_dependency(definitions, &mut errors);
        Self::check_cycles(definitions, &mut errors);
        Self::check_object_id_tag(definitions, &mut warnings);
        Self::check_identifier_names(definitions, &mut warnings);
        Self::check_normalized_keys(definitions, &mut warnings);
        Self::check_key_collisions(definitions, &mut warnings);

        ValidationResult {
            definitions: definitions.len(),
            errors,
            warnings,
        }
    }

    fn check_depends_on_present(definitions: &DefinitionSet, errors: &mut Vec<ValidationError>) {
        for definition in definitions.definitions() {
            if definition.depends_on.is_none() {
                errors.push(ValidationError {
                    code: "E001",
                    resource: definition.node_id(),
                    message: format!("missing '{}' key in {}", DEPENDS_ON_KEY, definition.file_name()),
                });
            }
        }
    }

    fn check_duplicate_ids(definitions: &DefinitionSet, errors: &mut Vec<ValidationError>) {
        let mut seen: HashMap<String, &ResourceDefinition> = HashMap::new();
        for definition in definitions.definitions() {
            if let Some(first) = seen.get(&definition.node_id()) {
                errors.push(ValidationError {
                    code: "E002",
                    resource: definition.node_id(),
                    message: format!(
                        "declared in {} and again in {}",
                        first.file_name(),
                        definition.file_name()
                    ),
                });
            } else {
                seen.insert(definition.node_id(), definition);
            }
        }
    }

    fn check_dependency_targets(definitions: &DefinitionSet, errors: &mut Vec<ValidationError>) {
        let declared: HashSet<String> = definitions.definitions().map(|d| d.node_id()).collect();
        for definition in definitions.definitions() {
            for dependency in definition.dependency_ids() {
                if !declared.contains(&dependency) {
                    errors.push(ValidationError {
                        code: "E003",
                        resource: definition.node_id(),
                        message: format!("depends on undeclared resource '{}'", dependency),
                    });
                }
            }
        }
    }

    fn check_self_dependency(definitions: &DefinitionSet, errors: &mut Vec<ValidationError>) {
        for definition in definitions.definitions() {
            let id = definition.node_id();
            if definition.dependency_ids().contains(&id) {
                errors.push(ValidationError {
                    code: "E004",
                    resource: id,
                    message: "depends on itself".to_string(),
                });
            }
        }
    }

    fn check_cycles(definitions: &DefinitionSet, errors: &mut Vec<ValidationError>) {
        // Only meaningful once every edge points at a known node
        let graph = DependencyGraph::from_definitions_lenient(definitions);
        if !graph.missing_dependencies().is_empty() {
            return;
        }

        if let Err(DbDriftError::CyclicalDependency { unresolved, .. }) = sort(&graph) {
            for resource in unresolved {
                errors.push(ValidationError {
                    code: "E005",
                    resource,
                    message: "participates in a dependency cycle".to_string(),
                });
            }
        }
    }

    fn check_object_id_tag(definitions: &DefinitionSet, warnings: &mut Vec<ValidationWarning>) {
        for definition in definitions.definitions() {
            if !definition.has_key(OBJECT_ID_TAG_KEY) {
                warnings.push(ValidationWarning {
                    code: "W001",
                    resource: definition.node_id(),
                    message: format!("no '{}' key; renames cannot be tracked", OBJECT_ID_TAG_KEY),
                });
            } else if definition.object_id_tag().is_none() {
                warnings.push(ValidationWarning {
                    code: "W002",
                    resource: definition.node_id(),
                    message: format!("'{}' is blank; run `dbdrift tag --write`", OBJECT_ID_TAG_KEY),
                });
            }
        }
    }

    fn check_identifier_names(definitions: &DefinitionSet, warnings: &mut Vec<ValidationWarning>) {
        let Some(identifier) = Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").ok() else {
            return;
        };

        for definition in definitions.definitions() {
            if !identifier.is_match(definition.name()) {
                warnings.push(ValidationWarning {
                    code: "W003",
                    resource: definition.node_id(),
                    message: format!("name '{}' is not a plain identifier", definition.name()),
                });
            }
        }
    }

    fn check_normalized_keys(definitions: &DefinitionSet, warnings: &mut Vec<ValidationWarning>) {
        for definition in definitions.definitions() {
            for key in definition.body.keys() {
                if key.trim().to_lowercase() != *key {
                    warnings.push(ValidationWarning {
                        code: "W004",
                        resource: definition.node_id(),
                        message: format!("key '{}' will be compared as '{}'", key, key.trim().to_lowercase()),
                    });
                }
            }
        }
    }

    fn check_key_collisions(definitions: &DefinitionSet, warnings: &mut Vec<ValidationWarning>) {
        for definition in definitions.definitions() {
            let mut collisions = Vec::new();
            collect_key_collisions(&definition.body, "", &mut collisions);

            for (normalized, keys) in collisions {
                warnings.push(ValidationWarning {
                    code: "W005",
                    resource: definition.node_id(),
                    message: format!(
                        "keys {} all normalize to '{}'; only '{}' is compared",
                        keys.iter().map(|k| format!("'{}'", k)).collect::<Vec<_>>().join(", "),
                        normalized,
                        keys.last().map(String::as_str).unwrap_or_default(),
                    ),
                });
            }
        }
    }
}

/// Groups of keys in one mapping (at any depth) that normalize to the same key.
///
/// The last key of each group in sorted order is the one normalization keeps.
fn collect_key_collisions(record: &Record, prefix: &str, collisions: &mut Vec<(String, Vec<String>)>) {
    let mut by_normalized: HashMap<String, Vec<String>> = HashMap::new();
    for key in record.keys() {
        by_normalized.entry(normalize_key(key)).or_default().push(key.clone());
    }

    let mut groups: Vec<_> = by_normalized.into_iter().filter(|(_, keys)| keys.len() > 1).collect();
    groups.sort();
    for (normalized, keys) in groups {
        collisions.push((format!("{}{}", prefix, normalized), keys));
    }

    for (key, value) in record {
        let nested_prefix = format!("{}{}::", prefix, normalize_key(key));
        match value {
            Value::Record(nested) => collect_key_collisions(nested, &nested_prefix, collisions),
            Value::Records(items) => {
                for item in items {
                    collect_key_collisions(item, &nested_prefix, collisions);
                }
            }
            _ => {}
        }
    }
}
