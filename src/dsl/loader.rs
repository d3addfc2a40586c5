use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use glob::glob;
use tracing::{debug, info};
use crate::error::{DbDriftError, Result};
use crate::value::Value;
use super::parser::{parse_definitions, DefinitionSet, ResourceGroup, NAME_KEY, OBJECT_ID_TAG_KEY};
use super::tagging::TagEdit;

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

pub struct DefinitionLoader;

impl DefinitionLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every `*.yml`/`*.yaml` file below `path`, in path order.
    pub fn load_dir(&self, path: impl AsRef<Path>) -> Result<DefinitionSet> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(DbDriftError::YamlFileNotFound(path.display().to_string()));
        }

        let mut yaml_files: Vec<PathBuf> = Vec::new();
        for extension in EXTENSIONS {
            let pattern = path.join(format!("**/*.{extension}"));
            let pattern_str = pattern.to_string_lossy();

            yaml_files.extend(
                glob(&pattern_str)
                    .map_err(|e| DbDriftError::DslParse(e.to_string()))?
                    .filter_map(|r| r.ok()),
            );
        }
        yaml_files.sort();

        let mut groups = Vec::new();
        for yaml_path in &yaml_files {
            groups.extend(self.load_file(yaml_path)?);
        }

        let definitions = DefinitionSet::new(groups);
        info!(
            "Loaded {} definitions from {} files in {}",
            definitions.len(),
            yaml_files.len(),
            path.display()
        );
        Ok(definitions)
    }

    pub fn load_file(&self, yaml_path: impl AsRef<Path>) -> Result<Vec<ResourceGroup>> {
        let yaml_path = yaml_path.as_ref();
        let yaml_content = fs::read_to_string(yaml_path)
            .map_err(|_| DbDriftError::YamlFileNotFound(yaml_path.display().to_string()))?;

        let groups = parse_definitions(&yaml_content, yaml_path)?;
        debug!("Parsed {} resource groups from {}", groups.len(), yaml_path.display());
        Ok(groups)
    }

    /// Write generated tags back into their source files. Returns the files changed.
    pub fn apply_tag_edits(&self, edits: &[TagEdit]) -> Result<Vec<PathBuf>> {
        let mut by_file: BTreeMap<&Path, Vec<&TagEdit>> = BTreeMap::new();
        for edit in edits {
            by_file.entry(edit.file.as_path()).or_default().push(edit);
        }

        let mut written = Vec::new();
        for (file, file_edits) in by_file {
            let content = fs::read_to_string(file)
                .map_err(|_| DbDriftError::YamlFileNotFound(file.display().to_string()))?;
            let mut document: serde_yaml::Value = serde_yaml::from_str(&content)?;

            for edit in file_edits {
                let entry = find_declaration(&mut document, &edit.resource_type, &edit.name)
                    .ok_or_else(|| {
                        DbDriftError::DslParse(format!(
                            "declaration {}::{} not found in {}",
                            edit.resource_type,
                            edit.name,
                            file.display()
                        ))
                    })?;
                entry.insert(
                    serde_yaml::Value::from(OBJECT_ID_TAG_KEY),
                    serde_yaml::Value::from(edit.tag.as_str()),
                );
            }

            fs::write(file, serde_yaml::to_string(&document)?)?;
            info!("Wrote object_id_tag values to {}", file.display());
            written.push(file.to_path_buf());
        }

        Ok(written)
    }
}

impl Default for DefinitionLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn find_declaration<'a>(
    document: &'a mut serde_yaml::Value,
    resource_type: &str,
    name: &str,
) -> Option<&'a mut serde_yaml::Mapping> {
    document
        .as_mapping_mut()?
        .get_mut(resource_type)?
        .as_sequence_mut()?
        .iter_mut()
        .filter_map(serde_yaml::Value::as_mapping_mut)
        .find(|entry| {
            entry
                .get(NAME_KEY)
                .cloned()
                .map(Value::from)
                .and_then(|v| v.scalar_text())
                .is_some_and(|declared| declared == name)
        })
}
