//! Build order: dependency graph + resolver.

mod graph;
mod resolver;

pub use graph::DependencyGraph;
pub use resolver::BuildOrderResolver;
