//! Dependency graph over projects.
//!
//! Design:
//! - Forward edges: project -> projects it depends on (must build first)
//! - Reverse edges: project -> projects that depend on it
//! - Invariant: edges and reverse_edges must be kept in sync
//! - Node insertion order is the tie-breaker for every ordered output

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::ProjectId;

/// DFS node colors for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

pub struct DependencyGraph {
    /// Nodes in insertion order.
    nodes: Vec<ProjectId>,

    /// Node -> insertion position.
    positions: HashMap<ProjectId, usize>,

    /// Forward edges: project -> projects it depends on
    edges: HashMap<ProjectId, HashSet<ProjectId>>,

    /// Reverse edges: project -> projects waiting for it
    reverse_edges: HashMap<ProjectId, HashSet<ProjectId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            positions: HashMap::new(),
            edges: HashMap::new(),
            reverse_edges: HashMap::new(),
        }
    }

    /// Add a node. Adding the same node twice keeps its first position.
    pub fn add_node(&mut self, project: ProjectId) {
        if self.positions.contains_key(&project) {
            return;
        }
        self.positions.insert(project, self.nodes.len());
        self.nodes.push(project);
    }

    /// Add a dependency: `project` depends on `depends_on`.
    ///
    /// Both endpoints are added as nodes if missing. Duplicate edges collapse.
    pub fn add_dependency(&mut self, project: ProjectId, depends_on: ProjectId) {
        self.add_node(project);
        self.add_node(depends_on);
        self.edges.entry(project).or_default().insert(depends_on);
        self.reverse_edges
            .entry(depends_on)
            .or_default()
            .insert(project);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependencies of a project, in insertion order.
    pub fn get_dependencies(&self, project: ProjectId) -> Vec<ProjectId> {
        self.sorted(self.edges.get(&project))
    }

    /// Projects that depend on `project`, in insertion order.
    pub fn get_dependents(&self, project: ProjectId) -> Vec<ProjectId> {
        self.sorted(self.reverse_edges.get(&project))
    }

    fn sorted(&self, set: Option<&HashSet<ProjectId>>) -> Vec<ProjectId> {
        let mut out: Vec<ProjectId> = set
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        out.sort_by_key(|p| self.positions.get(p).copied().unwrap_or(usize::MAX));
        out
    }

    /// Linearize so that every node comes after all of its dependencies.
    ///
    /// Kahn's algorithm. Among nodes that are ready at the same time the one
    /// inserted first wins, so the output is reproducible.
    ///
    /// Returns the cycle that blocked linearization on failure.
    pub fn topological_order(&self) -> Result<Vec<ProjectId>, Vec<ProjectId>> {
        let mut remaining: Vec<usize> = self
            .nodes
            .iter()
            .map(|p| self.edges.get(p).map(HashSet::len).unwrap_or(0))
            .collect();

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, deps)| **deps == 0)
            .map(|(pos, _)| pos)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(pos) = ready.pop_first() {
            let project = self.nodes[pos];
            order.push(project);

            for dependent in self.get_dependents(project) {
                let dep_pos = self.positions[&dependent];
                remaining[dep_pos] -= 1;
                if remaining[dep_pos] == 0 {
                    ready.insert(dep_pos);
                }
            }
        }

        if order.len() == self.nodes.len() {
            return Ok(order);
        }

        // A node left with unresolved dependencies may only sit downstream of
        // a cycle; report an actual cycle instead.
        Err(self.detect_cycle().unwrap_or_default())
    }

    /// Detect a cycle in the dependency graph.
    ///
    /// Returns the first cycle found (nodes in dependency direction, first
    /// node not repeated), or None if the graph is acyclic. Visits nodes and
    /// edges in insertion order, so the reported cycle is deterministic.
    pub fn detect_cycle(&self) -> Option<Vec<ProjectId>> {
        let mut colors: HashMap<ProjectId, Color> =
            self.nodes.iter().map(|p| (*p, Color::White)).collect();
        let mut path = Vec::new();

        for &start in &self.nodes {
            if colors[&start] == Color::White
                && let Some(cycle) = self.dfs_cycle(start, &mut colors, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: ProjectId,
        colors: &mut HashMap<ProjectId, Color>,
        path: &mut Vec<ProjectId>,
    ) -> Option<Vec<ProjectId>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for dep in self.get_dependencies(node) {
            match colors.get(&dep).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    let start = path.iter().position(|p| *p == dep).unwrap_or(0);
                    return Some(path[start..].to_vec());
                }
                Color::White => {
                    if let Some(cycle) = self.dfs_cycle(dep, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        colors.insert(node, Color::Black);
        path.pop();
        None
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
