use std::collections::{HashMap, VecDeque};
use tracing::debug;
use crate::error::{DbDriftError, Result};
use super::builder::DependencyGraph;

/// Order the graph so that every node comes after all of its prerequisites.
///
/// Unknown references are reported before any ordering is attempted.
pub fn sort(graph: &DependencyGraph) -> Result<Vec<String>> {
    let missing = graph.missing_dependencies();
    if !missing.is_empty() {
        return Err(DbDriftError::DependencyReference {
            missing,
            graph: graph.snapshot(),
        });
    }

    let mut in_degree: HashMap<&str, usize> = graph.nodes().map(|node| (node, 0)).collect();
    for node in graph.nodes() {
        for dependency in graph.dependencies(node) {
            if let Some(degree) = in_degree.get_mut(dependency.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = graph
        .nodes()
        .filter(|node| in_degree.get(node) == Some(&0))
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(graph.len());
    while let Some(node) = queue.pop_front() {
        sorted.push(node.to_string());

        for dependency in graph.dependencies(node) {
            if let Some(degree) = in_degree.get_mut(dependency.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependency.as_str());
                }
            }
        }
    }

    if sorted.len() < graph.len() {
        let mut unresolved: Vec<String> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(node, _)| node.to_string())
            .collect();
        unresolved.sort();

        return Err(DbDriftError::CyclicalDependency {
            unresolved,
            graph: graph.snapshot(),
        });
    }

    // Dependents were emitted first
    sorted.reverse();
    debug!("Resolved order: {:?}", sorted);
    Ok(sorted)
}
