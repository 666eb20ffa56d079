//! Reference resolver.
//!
//! Walks each node's parameters and turns symbolic references into edges of
//! a directed acyclic dependency graph. Resolution fails fast on unknown
//! targets and on cycles, so planning never sees a malformed graph.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{GraphError, Result, SitestackError};

use super::node::ResourceNode;

/// A resolved, acyclic dependency graph over resource nodes.
///
/// Nodes keep their declaration order, which is used to break ordering ties
/// deterministically.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Nodes in declaration order.
    nodes: Vec<ResourceNode>,
    /// For each node index, the indices of the nodes it references.
    dependencies: Vec<Vec<usize>>,
    /// Name to index lookup.
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Resolves a node set into a dependency graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if two nodes share a name,
    /// [`GraphError::UnresolvedReference`] if a reference names an absent
    /// node, and [`GraphError::CyclicDependency`] if the references form a
    /// cycle (self-references included).
    pub fn resolve(nodes: Vec<ResourceNode>) -> Result<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(SitestackError::Graph(GraphError::DuplicateNode {
                    name: node.name.clone(),
                }));
            }
        }

        let mut dependencies = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for (param, target) in node.references() {
                let Some(&target_idx) = index.get(target) else {
                    return Err(SitestackError::Graph(GraphError::UnresolvedReference {
                        node: node.name.clone(),
                        param: param.to_string(),
                        target: target.to_string(),
                    }));
                };
                dependencies[i].push(target_idx);
            }
        }

        let graph = Self {
            nodes,
            dependencies,
            index,
        };
        graph.check_acyclic()?;

        debug!("Resolved graph with {} nodes", graph.nodes.len());
        Ok(graph)
    }

    /// Detects cycles via depth-first traversal with a recursion-stack check.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InStack,
            Done,
        }

        fn visit(
            graph: &DependencyGraph,
            idx: usize,
            marks: &mut [Mark],
            stack: &mut Vec<usize>,
        ) -> Result<()> {
            marks[idx] = Mark::InStack;
            stack.push(idx);

            for &dep in &graph.dependencies[idx] {
                match marks[dep] {
                    Mark::InStack => {
                        // Reconstruct the cycle from where the stack re-enters.
                        let start = stack.iter().position(|&i| i == dep).unwrap_or(0);
                        let mut names: Vec<&str> = stack[start..]
                            .iter()
                            .map(|&i| graph.nodes[i].name.as_str())
                            .collect();
                        names.push(graph.nodes[dep].name.as_str());
                        return Err(SitestackError::Graph(GraphError::CyclicDependency {
                            cycle: names.join(" -> "),
                        }));
                    }
                    Mark::Unvisited => visit(graph, dep, marks, stack)?,
                    Mark::Done => {}
                }
            }

            stack.pop();
            marks[idx] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut stack = Vec::new();
        for idx in 0..self.nodes.len() {
            if marks[idx] == Mark::Unvisited {
                visit(self, idx, &mut marks, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Returns the nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets a node by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Returns the names of the nodes a node directly references.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index.get(name).map_or_else(Vec::new, |&i| {
            self.dependencies[i]
                .iter()
                .map(|&dep| self.nodes[dep].name.as_str())
                .collect()
        })
    }

    /// Returns node indices in a topological order respecting every edge.
    ///
    /// Kahn's algorithm; among nodes with no ordering constraint, the one
    /// declared first comes first, so the order is stable across runs.
    #[must_use]
    pub fn topological_order(&self) -> Vec<usize> {
        let n = self.nodes.len();

        // in_degree[i] = number of unapplied dependencies of node i.
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();

        // dependents[d] = nodes that reference d.
        let mut dependents = vec![Vec::new(); n];
        for (i, deps) in self.dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(i);
            }
        }

        let mut ready: std::collections::BTreeSet<usize> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for &dependent in &dependents[next] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        order
    }
}
