//! Observed-state collaborators.
//!
//! The core never talks to the target system itself; it asks a [`StateSource`]
//! for the live state of one resource at a time.

mod memory;
mod snapshot;

pub use memory::InMemoryStateSource;
pub use snapshot::SnapshotStateSource;

use crate::dsl::{ResourceDefinition, ResourceId};
use crate::error::StateFetchError;
use crate::value::Record;

pub type FetchResult<T> = std::result::Result<T, StateFetchError>;

/// Identity of the resource whose live state is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateQuery {
    pub id: ResourceId,
    /// Stable tag stored with the live object; lets a renamed resource be found.
    pub object_id_tag: Option<String>,
}

impl StateQuery {
    pub fn new(id: ResourceId) -> Self {
        Self { id, object_id_tag: None }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.object_id_tag = Some(tag.into());
        self
    }

    pub fn for_definition(definition: &ResourceDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            object_id_tag: definition.object_id_tag().map(str::to_string),
        }
    }
}

/// A live resource reported by [`StateSource::observed`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedResource {
    pub id: ResourceId,
    pub state: Record,
}

pub trait StateSource {
    /// Live state of one resource, or `None` when it does not exist.
    fn fetch(&self, query: &StateQuery) -> FetchResult<Option<Record>>;

    /// Every live resource of a type. Sources that cannot enumerate return nothing,
    /// which disables drop detection for them.
    fn observed(&self, _resource_type: &str) -> FetchResult<Vec<ObservedResource>> {
        Ok(Vec::new())
    }
}

impl<S: StateSource + ?Sized> StateSource for &S {
    fn fetch(&self, query: &StateQuery) -> FetchResult<Option<Record>> {
        (**self).fetch(query)
    }

    fn observed(&self, resource_type: &str) -> FetchResult<Vec<ObservedResource>> {
        (**self).observed(resource_type)
    }
}

/// Tag stored in an observed state, compared case-insensitively by callers.
pub(crate) fn state_tag(state: &Record) -> Option<&str> {
    state
        .iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(crate::dsl::OBJECT_ID_TAG_KEY))
        .and_then(|(_, value)| value.as_str())
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
}
