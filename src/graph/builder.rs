use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use crate::dsl::{DefinitionSet, DEPENDS_ON_KEY};
use crate::error::{DbDriftError, GraphSnapshot, Result};

/// Resource dependency graph.
///
/// Each node maps to the nodes it depends on (its prerequisites). Nodes keep
/// the order in which they were declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    order: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing the prerequisites of an existing one.
    pub fn insert(&mut self, node: impl Into<String>, dependencies: Vec<String>) {
        let node = node.into();
        if !self.edges.contains_key(&node) {
            self.order.push(node.clone());
        }
        self.edges.insert(node, dependencies);
    }

    /// Graph without any shape checks: a missing `depends_on` is treated as empty
    /// and a repeated id keeps its last declaration.
    pub fn from_definitions_lenient(definitions: &DefinitionSet) -> Self {
        let mut graph = Self::new();
        for definition in definitions.definitions() {
            graph.insert(definition.node_id(), definition.dependency_ids());
        }
        graph
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn dependencies(&self, node: &str) -> &[String] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, node: &str) -> bool {
        self.edges.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Referenced nodes that are not part of the graph, sorted.
    pub fn missing_dependencies(&self) -> Vec<String> {
        self.edges
            .values()
            .flatten()
            .filter(|dep| !self.contains(dep))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.edges
            .iter()
            .map(|(node, deps)| (node.clone(), deps.clone()))
            .collect()
    }
}

/// Build the graph for a set of declarations.
///
/// Every declaration must carry `depends_on`; referenced nodes are not checked
/// here.
pub fn build_graph(definitions: &DefinitionSet) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::new();
    let mut files: HashMap<String, String> = HashMap::new();

    for definition in definitions.definitions() {
        let node = definition.node_id();

        if definition.depends_on.is_none() {
            return Err(DbDriftError::missing_key(
                DEPENDS_ON_KEY,
                Some(&definition.file_name()),
                Some(definition.name()),
            ));
        }

        if let Some(first_file) = files.get(&node) {
            return Err(DbDriftError::DuplicateResource {
                id: node,
                files: vec![first_file.clone(), definition.file_name()],
            });
        }
        files.insert(node.clone(), definition.file_name());

        let dependencies = definition.dependency_ids();
        debug!("{} depends on {:?}", node, dependencies);
        graph.insert(node, dependencies);
    }

    Ok(graph)
}
