mod builder;
mod sorter;

pub use builder::{build_graph, DependencyGraph};
pub use sorter::sort;
