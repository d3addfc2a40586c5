mod parser;
mod loader;
mod tagging;
mod validator;

pub use parser::{
    parse_definition, parse_definitions, DefinitionSet, Dependencies, ResourceDefinition,
    ResourceGroup, ResourceId, DEPENDS_ON_KEY, NAME_KEY, NODE_SEPARATOR, OBJECT_ID_TAG_KEY,
};
pub use loader::DefinitionLoader;
pub use tagging::{assign_object_id_tags, generate_tag, TagAssignment, TagEdit};
pub use validator::{DefinitionValidator, ValidationError, ValidationResult, ValidationWarning};
