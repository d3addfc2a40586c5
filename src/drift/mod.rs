mod checksum;
mod keys;
mod normalizer;
mod resolver;
mod state;
mod values;

pub use checksum::fingerprint;
pub use keys::{check_keys, flatten_keys, PATH_SEPARATOR};
pub use normalizer::{normalize_key, normalize_value, Normalizer, PIPELINE_KEYS};
pub use resolver::{DriftResolver, Inspection};
pub use state::{CheckResult, IacAction, Resolution};
pub use values::check_values;
