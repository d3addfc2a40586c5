pub mod error;
pub mod value;
pub mod dsl;
pub mod graph;
pub mod drift;
pub mod state;
pub mod plan;
pub mod diff;

pub use error::{DbDriftError, GraphSnapshot, Result, StateFetchError};
pub use value::{entries_from_yaml, record_from_yaml, records_loosely_eq, Record, Value};
pub use dsl::{
    assign_object_id_tags, generate_tag, DefinitionLoader, DefinitionSet, DefinitionValidator,
    ResourceDefinition, ResourceGroup, ResourceId, TagAssignment, TagEdit, ValidationResult,
};
pub use graph::{build_graph, sort, DependencyGraph};
pub use drift::{
    check_keys, check_values, fingerprint, CheckResult, DriftResolver, IacAction, Inspection,
    Normalizer, Resolution,
};
pub use state::{InMemoryStateSource, ObservedResource, SnapshotStateSource, StateQuery, StateSource};
pub use plan::{Plan, PlanOptions, PlanStep, PlanSummary, PlanTableRow, Planner};
pub use diff::{changed_paths, format_value_diff};
