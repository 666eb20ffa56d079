//! Diff engine for comparing declared resources vs deployed state.
//!
//! This module computes the per-node difference between the resolved
//! resource graph and the last-applied state snapshot.

use tracing::debug;

use crate::config::ParamHasher;
use crate::graph::{DependencyGraph, ResourceKind, ResourceNode};
use crate::state::{DeployedState, ResourceState};

/// Engine for computing diffs between declared and deployed resources.
#[derive(Debug, Default)]
pub struct DiffEngine {
    /// Parameter hasher.
    hasher: ParamHasher,
}

/// Difference for a single resource.
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// Resource name.
    pub name: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Details about the difference.
    pub details: Vec<DiffDetail>,
    /// Hash recorded at last apply (if any).
    pub old_hash: Option<String>,
    /// Hash of the currently declared parameters (if declared).
    pub new_hash: Option<String>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Resource needs to be created.
    Create,
    /// Resource needs to be updated.
    Update,
    /// Resource needs to be deleted.
    Delete,
    /// Resource is unchanged.
    Noop,
}

/// Detail about a specific difference.
#[derive(Debug, Clone)]
pub struct DiffDetail {
    /// Parameter that differs.
    pub field: String,
    /// Last-applied value.
    pub old_value: Option<String>,
    /// Declared value.
    pub new_value: Option<String>,
}

/// Complete diff result, in declaration order with deletes appended.
#[derive(Debug)]
pub struct DiffResult {
    /// All resource diffs.
    pub diffs: Vec<ResourceDiff>,
    /// Number of resources to create.
    pub creates: usize,
    /// Number of resources to update.
    pub updates: usize,
    /// Number of resources to delete.
    pub deletes: usize,
    /// Number of unchanged resources.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ParamHasher::new(),
        }
    }

    /// Computes the diff between the declared graph and deployed state.
    #[must_use]
    pub fn compute(&self, graph: &DependencyGraph, state: &DeployedState) -> DiffResult {
        let mut diffs = Vec::new();

        // Declared nodes, in declaration order.
        for node in graph.nodes() {
            let new_hash = self.hasher.hash_node(node);
            let diff = Self::compute_node_diff(node, state.get(&node.name), &new_hash);
            diffs.push(diff);
        }

        // Tracked resources no longer declared.
        for (name, entry) in &state.resources {
            if graph.get(name).is_none() {
                debug!("Resource '{name}' removed from configuration");
                diffs.push(ResourceDiff {
                    name: name.clone(),
                    kind: entry.kind,
                    diff_type: DiffType::Delete,
                    details: vec![DiffDetail {
                        field: String::from("resource"),
                        old_value: Some(entry.provider_id.clone()),
                        new_value: None,
                    }],
                    old_hash: Some(entry.param_hash.clone()),
                    new_hash: None,
                });
            }
        }

        let creates = diffs.iter().filter(|d| d.diff_type == DiffType::Create).count();
        let updates = diffs.iter().filter(|d| d.diff_type == DiffType::Update).count();
        let deletes = diffs.iter().filter(|d| d.diff_type == DiffType::Delete).count();
        let unchanged = diffs.iter().filter(|d| d.diff_type == DiffType::Noop).count();

        DiffResult {
            diffs,
            creates,
            updates,
            deletes,
            unchanged,
        }
    }

    /// Computes the diff for a single declared node.
    fn compute_node_diff(
        node: &ResourceNode,
        entry: Option<&ResourceState>,
        new_hash: &str,
    ) -> ResourceDiff {
        match entry {
            None => {
                debug!("Resource '{}' needs to be created", node.name);
                ResourceDiff {
                    name: node.name.clone(),
                    kind: node.kind,
                    diff_type: DiffType::Create,
                    details: vec![],
                    old_hash: None,
                    new_hash: Some(new_hash.to_string()),
                }
            }
            Some(st) if st.param_hash == new_hash => {
                debug!("Resource '{}' is up to date", node.name);
                ResourceDiff {
                    name: node.name.clone(),
                    kind: node.kind,
                    diff_type: DiffType::Noop,
                    details: vec![],
                    old_hash: Some(st.param_hash.clone()),
                    new_hash: Some(new_hash.to_string()),
                }
            }
            Some(st) => {
                let details = Self::compute_param_diff(node, st);
                debug!("Resource '{}' needs update", node.name);
                ResourceDiff {
                    name: node.name.clone(),
                    kind: node.kind,
                    diff_type: DiffType::Update,
                    details,
                    old_hash: Some(st.param_hash.clone()),
                    new_hash: Some(new_hash.to_string()),
                }
            }
        }
    }

    /// Compares the declared snapshot against the last-applied one.
    fn compute_param_diff(node: &ResourceNode, entry: &ResourceState) -> Vec<DiffDetail> {
        let declared = node.param_snapshot();
        let mut details = Vec::new();

        for (name, new_value) in &declared {
            let old_value = entry.params.get(name);
            if old_value != Some(new_value) {
                details.push(DiffDetail {
                    field: name.clone(),
                    old_value: old_value.map(ToString::to_string),
                    new_value: Some(new_value.to_string()),
                });
            }
        }

        for name in entry.params.keys() {
            if !declared.contains_key(name) {
                details.push(DiffDetail {
                    field: name.clone(),
                    old_value: entry.params.get(name).map(ToString::to_string),
                    new_value: None,
                });
            }
        }

        details
    }
}

impl DiffResult {
    /// Returns true if there are any changes.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.creates > 0 || self.updates > 0 || self.deletes > 0
    }

    /// Returns the total number of changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.creates + self.updates + self.deletes
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Noop => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.diff_type)?;
        if !self.details.is_empty() {
            write!(f, " (")?;
            for (i, detail) in self.details.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", detail.field)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
