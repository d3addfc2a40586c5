use std::cell::RefCell;
use std::collections::HashMap;
use crate::dsl::ResourceId;
use crate::error::StateFetchError;
use crate::value::Record;
use super::{state_tag, FetchResult, ObservedResource, StateQuery, StateSource};

/// State source backed by a map, for tests and for embedding the core behind
/// a caller-owned fetch layer.
#[derive(Debug, Default)]
pub struct InMemoryStateSource {
    states: Vec<(ResourceId, Record)>,
    failures: HashMap<ResourceId, StateFetchError>,
    fetched: RefCell<Vec<ResourceId>>,
}

impl InMemoryStateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, id: ResourceId, state: Record) -> Self {
        self.insert(id, state);
        self
    }

    pub fn with_failure(mut self, id: ResourceId, error: StateFetchError) -> Self {
        self.failures.insert(id, error);
        self
    }

    pub fn insert(&mut self, id: ResourceId, state: Record) {
        self.states.retain(|(existing, _)| existing != &id);
        self.states.push((id, state));
    }

    /// Ids queried so far, in call order.
    pub fn fetched(&self) -> Vec<ResourceId> {
        self.fetched.borrow().clone()
    }
}

impl StateSource for InMemoryStateSource {
    fn fetch(&self, query: &StateQuery) -> FetchResult<Option<Record>> {
        self.fetched.borrow_mut().push(query.id.clone());

        if let Some(error) = self.failures.get(&query.id) {
            return Err(error.clone());
        }

        let by_tag = query.object_id_tag.as_deref().and_then(|tag| {
            self.states.iter().find(|(id, state)| {
                id.resource_type == query.id.resource_type
                    && state_tag(state).is_some_and(|t| t.eq_ignore_ascii_case(tag))
            })
        });

        let found = by_tag.or_else(|| self.states.iter().find(|(id, _)| id == &query.id));
        Ok(found.map(|(_, state)| state.clone()))
    }

    fn observed(&self, resource_type: &str) -> FetchResult<Vec<ObservedResource>> {
        Ok(self
            .states
            .iter()
            .filter(|(id, _)| id.resource_type == resource_type)
            .map(|(id, state)| ObservedResource { id: id.clone(), state: state.clone() })
            .collect())
    }
}
