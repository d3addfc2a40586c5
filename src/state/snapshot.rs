use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::dsl::ResourceId;
use crate::error::StateFetchError;
use crate::value::{Record, Value};
use super::{state_tag, FetchResult, ObservedResource, StateQuery, StateSource};

/// Observed state captured to a file: `{resource_type: {resource_name: state}}`.
///
/// YAML and JSON files are both accepted.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStateSource {
    path: Option<PathBuf>,
    resources: BTreeMap<String, BTreeMap<String, Value>>,
}

impl SnapshotStateSource {
    pub fn load(path: impl AsRef<Path>) -> FetchResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|_| StateFetchError::SnapshotNotFound {
            path: path.display().to_string(),
        })?;

        let mut source = Self::from_yaml(&content).map_err(|e| match e {
            StateFetchError::MalformedResponse { reason, .. } => {
                StateFetchError::malformed(path.display().to_string(), reason)
            }
            other => other,
        })?;
        source.path = Some(path.to_path_buf());

        debug!("Loaded state snapshot {} ({} types)", path.display(), source.resources.len());
        Ok(source)
    }

    pub fn from_yaml(content: &str) -> FetchResult<Self> {
        let resources: Option<BTreeMap<String, Option<BTreeMap<String, Value>>>> =
            serde_yaml::from_str(content)
                .map_err(|e| StateFetchError::malformed("<snapshot>", e.to_string()))?;

        let resources = resources
            .unwrap_or_default()
            .into_iter()
            .map(|(resource_type, entries)| (resource_type, entries.unwrap_or_default()))
            .collect();

        Ok(Self { path: None, resources })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_state(id: &ResourceId, value: &Value) -> FetchResult<Record> {
        match value {
            Value::Record(record) => Ok(record.clone()),
            other => Err(StateFetchError::malformed(
                id.to_string(),
                format!("expected a mapping, found {}", other.kind()),
            )),
        }
    }

    fn find_by_tag<'a>(entries: &'a BTreeMap<String, Value>, tag: &str) -> Option<(&'a String, &'a Value)> {
        entries.iter().find(|(_, value)| {
            value
                .as_record()
                .and_then(state_tag)
                .is_some_and(|observed| observed.eq_ignore_ascii_case(tag))
        })
    }

    fn find_by_name<'a>(entries: &'a BTreeMap<String, Value>, name: &str) -> Option<(&'a String, &'a Value)> {
        entries
            .get_key_value(name)
            .or_else(|| entries.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
    }
}

impl StateSource for SnapshotStateSource {
    fn fetch(&self, query: &StateQuery) -> FetchResult<Option<Record>> {
        let Some(entries) = self.resources.get(&query.id.resource_type) else {
            return Ok(None);
        };

        let found = query
            .object_id_tag
            .as_deref()
            .and_then(|tag| Self::find_by_tag(entries, tag))
            .or_else(|| Self::find_by_name(entries, &query.id.name));

        match found {
            Some((key, value)) => {
                debug!("Snapshot entry '{}' matched {}", key, query.id);
                Self::entry_state(&query.id, value).map(Some)
            }
            None => Ok(None),
        }
    }

    fn observed(&self, resource_type: &str) -> FetchResult<Vec<ObservedResource>> {
        let Some(entries) = self.resources.get(resource_type) else {
            return Ok(Vec::new());
        };

        entries
            .iter()
            .map(|(name, value)| {
                let id = ResourceId::new(resource_type, name.as_str());
                let state = Self::entry_state(&id, value)?;
                Ok(ObservedResource { id, state })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
database:
  analytics:
    name: analytics
    comment: warehouse
    object_id_tag: 2f1c
  Legacy:
    name: legacy
schema:
  broken: "not a mapping"
role:
"#;

    fn query(resource_type: &str, name: &str) -> StateQuery {
        StateQuery::new(ResourceId::new(resource_type, name))
    }

    #[test]
    fn test_fetch_by_name() {
        let source = SnapshotStateSource::from_yaml(SNAPSHOT).unwrap();
        let state = source.fetch(&query("database", "analytics")).unwrap().unwrap();
        assert_eq!(state.get("comment"), Some(&Value::from("warehouse")));

        let state = source.fetch(&query("database", "legacy")).unwrap();
        assert!(state.is_some());
    }

    #[test]
    fn test_fetch_by_tag_finds_renamed_resource() {
        let source = SnapshotStateSource::from_yaml(SNAPSHOT).unwrap();
        let state = source
            .fetch(&query("database", "analytics_v2").with_tag("2F1C"))
            .unwrap()
            .unwrap();
        assert_eq!(state.get("name"), Some(&Value::from("analytics")));
    }

    #[test]
    fn test_fetch_absent() {
        let source = SnapshotStateSource::from_yaml(SNAPSHOT).unwrap();
        assert_eq!(source.fetch(&query("database", "missing")).unwrap(), None);
        assert_eq!(source.fetch(&query("warehouse", "wh")).unwrap(), None);
        assert_eq!(source.fetch(&query("role", "any")).unwrap(), None);
    }

    #[test]
    fn test_malformed_entry() {
        let source = SnapshotStateSource::from_yaml(SNAPSHOT).unwrap();
        let err = source.fetch(&query("schema", "broken")).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
        assert!(source.observed("schema").is_err());
    }

    #[test]
    fn test_observed_lists_entries() {
        let source = SnapshotStateSource::from_yaml(SNAPSHOT).unwrap();
        let observed = source.observed("database").unwrap();
        let names: Vec<&str> = observed.iter().map(|o| o.id.name.as_str()).collect();
        assert_eq!(names, vec!["Legacy", "analytics"]);
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SnapshotStateSource::load("does/not/exist.yaml").unwrap_err();
        assert_eq!(err.error_code(), "SNAPSHOT_NOT_FOUND");
    }

    #[test]
    fn test_json_snapshot() {
        let source = SnapshotStateSource::from_yaml(r#"{"table": {"orders": {"name": "orders"}}}"#).unwrap();
        assert!(source.fetch(&query("table", "orders")).unwrap().is_some());
    }
}
