//! Build order resolution.
//!
//! Invoked on demand (before a "build all" sweep) rather than maintained
//! incrementally: dependency edits are rare compared to builds.

use std::collections::HashSet;

use tracing::debug;

use super::graph::DependencyGraph;
use crate::domain::{MillError, Project, ProjectId};

/// Computes a dependency-respecting build order over a project snapshot.
///
/// Stateless and side-effect free.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOrderResolver;

impl BuildOrderResolver {
    pub fn new() -> Self {
        Self
    }

    /// Order `projects` so that each one follows all of its dependencies.
    ///
    /// `projects` must be in registration order; independent projects keep
    /// that relative order.
    ///
    /// # Errors
    /// - `ConfigurationError` if a project depends on an id not in the snapshot.
    /// - `CycleDetected` naming a project on the cycle. No partial order is returned.
    pub fn resolve(&self, projects: &[Project]) -> Result<Vec<ProjectId>, MillError> {
        let graph = Self::graph(projects)?;

        let order = graph.topological_order().map_err(|cycle| {
            let project_id = cycle.first().copied().unwrap_or(ProjectId::new(0));
            MillError::CycleDetected { project_id, cycle }
        })?;

        debug!(projects = order.len(), "resolved build order");
        Ok(order)
    }

    fn graph(projects: &[Project]) -> Result<DependencyGraph, MillError> {
        let known: HashSet<ProjectId> = projects.iter().map(|p| p.id).collect();

        let mut graph = DependencyGraph::new();
        for project in projects {
            graph.add_node(project.id);
        }
        for project in projects {
            for &dependency in &project.dependencies {
                if !known.contains(&dependency) {
                    return Err(MillError::ConfigurationError(format!(
                        "{} ({}) depends on unknown {}",
                        project.id, project.name, dependency
                    )));
                }
                graph.add_dependency(project.id, dependency);
            }
        }
        Ok(graph)
    }
}
