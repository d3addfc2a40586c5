use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;
use crate::error::{DbDriftError, Result};
use crate::value::Value;
use super::parser::{DefinitionSet, OBJECT_ID_TAG_KEY};

/// A generated tag that still has to be written back to its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEdit {
    pub file: PathBuf,
    pub resource_type: String,
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone)]
pub struct TagAssignment {
    pub definitions: DefinitionSet,
    pub edits: Vec<TagEdit>,
}

impl TagAssignment {
    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Deterministic tag for a resource name: UUIDv3 in the DNS namespace.
pub fn generate_tag(name: &str) -> String {
    Uuid::new_v3(&Uuid::NAMESPACE_DNS, name.as_bytes()).to_string()
}

/// Fill every blank `object_id_tag`.
///
/// Each declaration must carry the key; existing tags are left untouched, so a
/// second pass over the result yields no edits.
pub fn assign_object_id_tags(definitions: &DefinitionSet) -> Result<TagAssignment> {
    let mut groups = definitions.groups().to_vec();
    let mut edits = Vec::new();

    for group in &mut groups {
        for definition in &mut group.definitions {
            if !definition.has_key(OBJECT_ID_TAG_KEY) {
                return Err(DbDriftError::missing_key(
                    OBJECT_ID_TAG_KEY,
                    Some(&definition.file_name()),
                    Some(definition.name()),
                ));
            }

            if definition.object_id_tag().is_some() {
                continue;
            }

            let tag = generate_tag(definition.name());
            debug!("Generated object_id_tag {} for {}", tag, definition.id);
            definition
                .body
                .insert(OBJECT_ID_TAG_KEY.to_string(), Value::from(tag.as_str()));

            edits.push(TagEdit {
                file: definition.file.clone(),
                resource_type: definition.id.resource_type.clone(),
                name: definition.id.name.clone(),
                tag,
            });
        }
    }

    Ok(TagAssignment {
        definitions: DefinitionSet::new(groups),
        edits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parser::parse_definitions;
    use std::path::Path;

    fn set(content: &str) -> DefinitionSet {
        DefinitionSet::new(parse_definitions(content, Path::new("role.yml")).unwrap())
    }

    #[test]
    fn test_generate_tag_is_deterministic() {
        assert_eq!(generate_tag("analyst"), generate_tag("analyst"));
        assert_ne!(generate_tag("analyst"), generate_tag("loader"));
        assert_eq!(generate_tag("analyst").len(), 36);
    }

    #[test]
    fn test_blank_tags_are_filled() {
        let definitions = set(
            "role:\n  - name: analyst\n    object_id_tag:\n    depends_on:\n  - name: loader\n    object_id_tag: fixed\n    depends_on:\n",
        );

        let assignment = assign_object_id_tags(&definitions).unwrap();
        assert_eq!(assignment.edits.len(), 1);
        assert_eq!(assignment.edits[0].name, "analyst");
        assert_eq!(assignment.edits[0].tag, generate_tag("analyst"));

        let analyst = assignment.definitions.get("role::analyst").unwrap();
        assert_eq!(analyst.object_id_tag(), Some(generate_tag("analyst").as_str()));
        let loader = assignment.definitions.get("role::loader").unwrap();
        assert_eq!(loader.object_id_tag(), Some("fixed"));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let definitions = set("role:\n  - name: analyst\n    object_id_tag: \"\"\n    depends_on:\n");
        let first = assign_object_id_tags(&definitions).unwrap();
        let second = assign_object_id_tags(&first.definitions).unwrap();

        assert!(!first.is_unchanged());
        assert!(second.is_unchanged());
        assert_eq!(first.definitions, second.definitions);
    }

    #[test]
    fn test_missing_tag_key_is_an_error() {
        let definitions = set("role:\n  - name: analyst\n    depends_on:\n");
        let err = assign_object_id_tags(&definitions).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid or missing keys: ['object_id_tag'] for the object name = 'analyst' in the file = 'role.yml'."
        );
    }
}
