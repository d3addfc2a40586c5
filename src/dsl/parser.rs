use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use crate::error::{DbDriftError, Result};
use crate::value::{entries_from_yaml, Record, Value};

pub const NAME_KEY: &str = "name";
pub const DEPENDS_ON_KEY: &str = "depends_on";
pub const OBJECT_ID_TAG_KEY: &str = "object_id_tag";
pub const NODE_SEPARATOR: &str = "::";

/// `resource type -> resource names` a declaration depends on.
pub type Dependencies = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    pub fn node_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.resource_type, NODE_SEPARATOR, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = DbDriftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(NODE_SEPARATOR) {
            Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
                Ok(ResourceId::new(resource_type, name))
            }
            _ => Err(DbDriftError::DslParse(format!(
                "invalid resource id '{s}', expected <type>::<name>"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub id: ResourceId,
    /// `None` when the declaration has no `depends_on` key at all.
    pub depends_on: Option<Dependencies>,
    /// The declaration exactly as written, pipeline keys included.
    pub body: Record,
    pub file: PathBuf,
}

impl ResourceDefinition {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn resource_type(&self) -> &str {
        &self.id.resource_type
    }

    pub fn node_id(&self) -> String {
        self.id.node_id()
    }

    pub fn file_name(&self) -> String {
        self.file.display().to_string()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    /// Non-blank `object_id_tag`, if any.
    pub fn object_id_tag(&self) -> Option<&str> {
        self.body
            .get(OBJECT_ID_TAG_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// Dependency node ids in `type::name` form.
    pub fn dependency_ids(&self) -> Vec<String> {
        self.depends_on
            .iter()
            .flatten()
            .flat_map(|(dep_type, names)| {
                names
                    .iter()
                    .map(move |name| format!("{dep_type}{NODE_SEPARATOR}{name}"))
            })
            .collect()
    }
}

/// All declarations of one resource type found in one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroup {
    pub resource_type: String,
    pub file: PathBuf,
    pub definitions: Vec<ResourceDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionSet {
    groups: Vec<ResourceGroup>,
    /// node id -> (group, definition) position of its first declaration
    index: HashMap<String, (usize, usize)>,
}

impl DefinitionSet {
    pub fn new(groups: Vec<ResourceGroup>) -> Self {
        let mut index = HashMap::new();
        for (g, group) in groups.iter().enumerate() {
            for (d, definition) in group.definitions.iter().enumerate() {
                index.entry(definition.node_id()).or_insert((g, d));
            }
        }
        Self { groups, index }
    }

    pub fn groups(&self) -> &[ResourceGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<ResourceGroup> {
        self.groups
    }

    /// Definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.groups.iter().flat_map(|g| g.definitions.iter())
    }

    /// First declaration of `node_id`.
    pub fn get(&self, node_id: &str) -> Option<&ResourceDefinition> {
        let (g, d) = *self.index.get(node_id)?;
        self.groups.get(g)?.definitions.get(d)
    }

    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a ResourceDefinition> {
        self.definitions().filter(move |d| d.resource_type() == resource_type)
    }

    /// Distinct resource types in first-seen order.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for group in &self.groups {
            if !types.contains(&group.resource_type.as_str()) {
                types.push(&group.resource_type);
            }
        }
        types
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.definitions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse one definitions document: `{resource_type: [declaration, ...]}`.
pub fn parse_definitions(content: &str, file: &Path) -> Result<Vec<ResourceGroup>> {
    let document = entries_from_yaml(content)?;
    let mut groups = Vec::new();

    for (resource_type, entries) in document {
        let declarations: Vec<Record> = match entries {
            Value::Records(records) => records,
            Value::Null => Vec::new(),
            Value::List(items) if items.is_empty() => Vec::new(),
            other => {
                return Err(DbDriftError::DslParse(format!(
                    "expected a list of declarations under '{}' in {}, found {}",
                    resource_type,
                    file.display(),
                    other.kind()
                )))
            }
        };

        let definitions = declarations
            .into_iter()
            .map(|body| parse_definition(&resource_type, body, file))
            .collect::<Result<Vec<_>>>()?;

        groups.push(ResourceGroup {
            resource_type,
            file: file.to_path_buf(),
            definitions,
        });
    }

    Ok(groups)
}

pub fn parse_definition(resource_type: &str, body: Record, file: &Path) -> Result<ResourceDefinition> {
    let file_name = file.display().to_string();

    let name = body
        .get(NAME_KEY)
        .and_then(Value::scalar_text)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| DbDriftError::missing_key(NAME_KEY, Some(&file_name), None))?;

    let depends_on = match body.get(DEPENDS_ON_KEY) {
        None => None,
        Some(value) => Some(parse_dependencies(value).ok_or_else(|| {
            DbDriftError::missing_key(DEPENDS_ON_KEY, Some(&file_name), Some(&name))
        })?),
    };

    Ok(ResourceDefinition {
        id: ResourceId::new(resource_type, name),
        depends_on,
        body,
        file: file.to_path_buf(),
    })
}

/// `None` when the value is not a mapping of type to name list.
fn parse_dependencies(value: &Value) -> Option<Dependencies> {
    let map = match value {
        Value::Null => return Some(Dependencies::new()),
        Value::List(items) if items.is_empty() => return Some(Dependencies::new()),
        Value::Record(map) => map,
        _ => return None,
    };

    let mut dependencies = Dependencies::new();
    for (dep_type, names) in map {
        let names = match names {
            Value::Null => Vec::new(),
            Value::List(items) => items
                .iter()
                .map(Value::scalar_text)
                .collect::<Option<Vec<_>>>()?,
            scalar => vec![scalar.scalar_text()?],
        };
        dependencies.insert(dep_type.clone(), names);
    }
    Some(dependencies)
}
