//! Plan types and construction.
//!
//! A plan is an ordered action list: deletes first, in reverse dependency
//! order of the recorded state, then creates/updates/noops in topological
//! order of the declared graph. The ordering is deterministic so plans are
//! diffable across runs.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

use crate::graph::{DependencyGraph, RemovalPolicy, ResourceKind};
use crate::state::DeployedState;

use super::diff::{DiffEngine, DiffResult, DiffType};

/// A complete execution plan.
#[derive(Debug)]
pub struct Plan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Planned actions in execution order.
    pub actions: Vec<PlanAction>,
}

/// A single planned action.
#[derive(Debug, Clone)]
pub struct PlanAction {
    /// Action type.
    pub kind: ActionKind,
    /// Node name.
    pub node: String,
    /// Resource kind.
    pub resource_kind: ResourceKind,
    /// Removal policy governing delete behavior.
    pub removal_policy: RemovalPolicy,
    /// Reason for this action.
    pub reason: String,
    /// Parameter hash to record on success (create/update only).
    pub new_hash: Option<String>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Create a new resource.
    Create,
    /// Update an existing resource in place.
    Update,
    /// Delete a resource.
    Delete,
    /// No operation (for tracking).
    Noop,
}

impl Plan {
    /// Builds a plan from the declared graph and deployed state.
    ///
    /// Every create/update is sequenced strictly after the creates/updates
    /// of the nodes it references; every delete is sequenced strictly before
    /// the deletes of the nodes it depended on.
    #[must_use]
    pub fn build(graph: &DependencyGraph, state: &DeployedState) -> Self {
        let diff = DiffEngine::new().compute(graph, state);
        Self::from_diff(&diff, graph, state)
    }

    /// Builds a plan from a precomputed diff.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, graph: &DependencyGraph, state: &DeployedState) -> Self {
        let mut actions = Vec::new();

        // Deletes first, dependents before their former dependencies. A
        // delete only ever originates from a state entry; if the entry is
        // gone there is nothing to act on.
        for name in Self::order_deletes(diff, state) {
            let Some(entry) = state.get(&name) else {
                debug!("Delete planned for '{name}' but no state entry remains; skipping");
                continue;
            };
            let (kind, policy) = (entry.kind, entry.removal_policy);
            let reason = if policy == RemovalPolicy::Retain {
                String::from("Removed from configuration (retained, state only)")
            } else {
                String::from("Removed from configuration")
            };
            actions.push(PlanAction {
                kind: ActionKind::Delete,
                node: name,
                resource_kind: kind,
                removal_policy: policy,
                reason,
                new_hash: None,
            });
        }

        // Then creates/updates/noops in topological order.
        for idx in graph.topological_order() {
            let node = &graph.nodes()[idx];
            let Some(node_diff) = diff.diffs.iter().find(|d| d.name == node.name) else {
                continue;
            };

            let (kind, reason) = match node_diff.diff_type {
                DiffType::Create => (
                    ActionKind::Create,
                    String::from("Not present in state"),
                ),
                DiffType::Update => {
                    let fields: Vec<&str> = node_diff
                        .details
                        .iter()
                        .map(|d| d.field.as_str())
                        .collect();
                    (
                        ActionKind::Update,
                        format!("Parameters changed: {}", fields.join(", ")),
                    )
                }
                DiffType::Noop => (ActionKind::Noop, String::from("Up to date")),
                DiffType::Delete => continue,
            };

            actions.push(PlanAction {
                kind,
                node: node.name.clone(),
                resource_kind: node.kind,
                removal_policy: node.removal_policy,
                reason,
                new_hash: node_diff.new_hash.clone(),
            });
        }

        Self {
            created_at: Utc::now(),
            actions,
        }
    }

    /// Orders deleted nodes so each is removed before anything it depended
    /// on, using the dependency names recorded in state.
    ///
    /// Ties break by name order. If the recorded dependencies were corrupted
    /// into a cycle, the remainder is appended in name order so planning
    /// still terminates.
    fn order_deletes(diff: &DiffResult, state: &DeployedState) -> Vec<String> {
        let mut remaining: BTreeSet<&str> = diff
            .diffs
            .iter()
            .filter(|d| d.diff_type == DiffType::Delete)
            .map(|d| d.name.as_str())
            .collect();

        let has_remaining_dependent = |name: &str, remaining: &BTreeSet<&str>| {
            remaining.iter().any(|&other| {
                other != name
                    && state
                        .get(other)
                        .is_some_and(|entry| entry.depends_on.iter().any(|d| d == name))
            })
        };

        let mut order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .find(|&&name| !has_remaining_dependent(name, &remaining))
                .copied();

            match next {
                Some(name) => {
                    remaining.remove(name);
                    order.push(name.to_string());
                }
                None => {
                    order.extend(remaining.iter().map(|&n| n.to_string()));
                    break;
                }
            }
        }

        order
    }

    /// Returns true if the plan contains no actions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns true if every action is a noop.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.kind != ActionKind::Noop)
    }

    /// Returns the number of actions of the given kind.
    #[must_use]
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }
}

impl PlanAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.kind {
            ActionKind::Create => format!("Create {} '{}'", self.resource_kind, self.node),
            ActionKind::Update => format!("Update {} '{}'", self.resource_kind, self.node),
            ActionKind::Delete => format!("Delete {} '{}'", self.resource_kind, self.node),
            ActionKind::Noop => format!("No change for '{}'", self.node),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Noop => "noop",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.node)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_changes() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamHasher;
    use crate::graph::{ResourceKind, ResourceNode};
    use crate::state::ResourceState;

    fn site_nodes() -> Vec<ResourceNode> {
        vec![
            ResourceNode::new(String::from("zone"), ResourceKind::Zone)
                .with_param("domain_name", "example.com"),
            ResourceNode::new(String::from("certificate"), ResourceKind::Certificate)
                .with_param("domain_name", "example.com")
                .with_param("region", "us-east-1")
                .with_ref("hosted_zone", "zone"),
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
            ResourceNode::new(String::from("distribution"), ResourceKind::Distribution)
                .with_ref("origin", "site-bucket")
                .with_ref("certificate", "certificate"),
            ResourceNode::new(String::from("www-alias"), ResourceKind::AliasRecord)
                .with_param("record_name", "www.example.com")
                .with_ref("zone", "zone")
                .with_ref("target", "distribution"),
        ]
    }

    fn deployed(nodes: &[ResourceNode]) -> DeployedState {
        let hasher = ParamHasher::new();
        let mut state = DeployedState::new("site", "dev");
        for (i, node) in nodes.iter().enumerate() {
            let mut entry = ResourceState::new(
                &node.name,
                node.kind,
                &format!("id-{i}"),
                &hasher.hash_node(node),
            );
            entry.params = node.param_snapshot();
            entry.removal_policy = node.removal_policy;
            entry.depends_on = node.references().map(|(_, t)| t.to_string()).collect();
            state.set(entry);
        }
        state
    }

    fn position(plan: &Plan, node: &str) -> usize {
        plan.actions
            .iter()
            .position(|a| a.node == node)
            .expect("node should be planned")
    }

    #[test]
    fn test_empty_state_yields_ordered_creates() {
        let graph = DependencyGraph::resolve(site_nodes()).expect("graph");
        let state = DeployedState::new("site", "dev");
        let plan = Plan::build(&graph, &state);

        assert_eq!(plan.count(ActionKind::Create), 5);
        assert!(position(&plan, "zone") < position(&plan, "certificate"));
        assert!(position(&plan, "site-bucket") < position(&plan, "distribution"));
        assert!(position(&plan, "certificate") < position(&plan, "distribution"));
        assert!(position(&plan, "distribution") < position(&plan, "www-alias"));
    }

    #[test]
    fn test_plan_is_idempotent() {
        let nodes = site_nodes();
        let graph = DependencyGraph::resolve(nodes.clone()).expect("graph");
        let state = deployed(&nodes);

        let plan = Plan::build(&graph, &state);
        assert!(!plan.has_changes());
        assert_eq!(plan.count(ActionKind::Noop), 5);

        // Building again changes nothing.
        let again = Plan::build(&graph, &state);
        assert_eq!(again.count(ActionKind::Noop), 5);
    }

    #[test]
    fn test_changed_param_yields_update() {
        let mut nodes = site_nodes();
        let state = deployed(&nodes);

        nodes[2] = ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
            .with_param("bucket_name", "cdn.example.com");
        let graph = DependencyGraph::resolve(nodes).expect("graph");

        let plan = Plan::build(&graph, &state);
        assert_eq!(plan.count(ActionKind::Update), 1);
        assert_eq!(plan.count(ActionKind::Noop), 4);
        let action = plan
            .actions
            .iter()
            .find(|a| a.kind == ActionKind::Update)
            .expect("update action");
        assert_eq!(action.node, "site-bucket");
        assert!(action.reason.contains("bucket_name"));
    }

    #[test]
    fn test_removed_nodes_delete_dependents_first() {
        let nodes = site_nodes();
        let state = deployed(&nodes);

        // Remove the distribution and alias; alias depended on distribution.
        let remaining: Vec<ResourceNode> = nodes
            .into_iter()
            .filter(|n| n.name != "distribution" && n.name != "www-alias")
            .collect();
        let graph = DependencyGraph::resolve(remaining).expect("graph");

        let plan = Plan::build(&graph, &state);
        assert_eq!(plan.count(ActionKind::Delete), 2);
        assert!(position(&plan, "www-alias") < position(&plan, "distribution"));
        // Deletes come before everything else.
        assert_eq!(plan.actions[0].kind, ActionKind::Delete);
        assert_eq!(plan.actions[1].kind, ActionKind::Delete);
    }

    #[test]
    fn test_retained_node_keeps_policy_on_delete() {
        let nodes = vec![
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com")
                .with_removal_policy(RemovalPolicy::Retain),
        ];
        let state = deployed(&nodes);
        let graph = DependencyGraph::resolve(vec![]).expect("graph");

        let plan = Plan::build(&graph, &state);
        assert_eq!(plan.count(ActionKind::Delete), 1);
        assert_eq!(plan.actions[0].removal_policy, RemovalPolicy::Retain);
    }

    #[test]
    fn test_delete_without_state_entry_is_skipped() {
        use super::super::diff::ResourceDiff;

        let state = DeployedState::new("site", "dev");
        let graph = DependencyGraph::resolve(vec![]).expect("graph");

        // A delete diff whose backing state entry has vanished.
        let diff = DiffResult {
            diffs: vec![ResourceDiff {
                name: String::from("ghost"),
                kind: ResourceKind::Distribution,
                diff_type: DiffType::Delete,
                details: vec![],
                old_hash: Some(String::from("stale")),
                new_hash: None,
            }],
            creates: 0,
            updates: 0,
            deletes: 1,
            unchanged: 0,
        };

        let plan = Plan::from_diff(&diff, &graph, &state);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_destroy_plan_reverses_creation_order() {
        let nodes = site_nodes();
        let state = deployed(&nodes);
        let graph = DependencyGraph::resolve(vec![]).expect("graph");

        let plan = Plan::build(&graph, &state);
        assert_eq!(plan.count(ActionKind::Delete), 5);
        assert!(position(&plan, "www-alias") < position(&plan, "distribution"));
        assert!(position(&plan, "distribution") < position(&plan, "certificate"));
        assert!(position(&plan, "distribution") < position(&plan, "site-bucket"));
        assert!(position(&plan, "certificate") < position(&plan, "zone"));
    }
}
