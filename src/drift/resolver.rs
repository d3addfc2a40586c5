use tracing::debug;
use crate::error::{DbDriftError, Result};
use crate::state::{StateQuery, StateSource};
use crate::value::Record;
use super::keys::check_keys;
use super::normalizer::Normalizer;
use super::state::Resolution;
use super::values::check_values;

/// Resolution plus the normalized views it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub resolution: Resolution,
    pub declared: Record,
    /// `None` when the resource does not exist yet.
    pub observed: Option<Record>,
}

/// Decides the reconciliation action for one resource at a time.
pub struct DriftResolver<'a, S: StateSource + ?Sized> {
    source: &'a S,
    normalizer: Normalizer,
}

impl<'a, S: StateSource + ?Sized> DriftResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Compare a raw declaration against the live state of the resource.
    ///
    /// A key-set mismatch aborts with [`DbDriftError::StructuralDrift`].
    pub fn resource_state(&self, definition: &Record, query: &StateQuery, name: &str) -> Result<Resolution> {
        self.inspect(definition, query, name).map(|inspection| inspection.resolution)
    }

    pub fn inspect(&self, definition: &Record, query: &StateQuery, name: &str) -> Result<Inspection> {
        let declared = self.normalizer.normalize(definition);

        let fetched = self
            .source
            .fetch(query)
            .map_err(|source| DbDriftError::StateFetch {
                resource: query.id.to_string(),
                source,
            })?;

        let Some(raw_state) = fetched else {
            debug!("{} not found, planning create", query.id);
            return Ok(Inspection {
                resolution: Resolution::create(declared.clone()),
                declared,
                observed: None,
            });
        };

        let observed = self.normalizer.normalize(&raw_state);
        check_keys(&declared, &observed, name)?;

        let values = check_values(&declared, &observed);
        let resolution = match values.diff {
            Some(diff) if !values.matched => {
                debug!("{} drifted on {} keys", query.id, diff.len());
                Resolution::alter(diff)
            }
            _ => Resolution::no_action(),
        };

        Ok(Inspection {
            resolution,
            declared,
            observed: Some(observed),
        })
    }
}
