//! Deployment output collection.
//!
//! After an apply, each resource kind exposes a fixed set of named exports
//! (zone id, certificate ARN, distribution domain). The reporter gathers
//! them from deployed state in declaration order, so output listings are
//! stable across runs.

use serde::Serialize;
use tracing::debug;

use crate::graph::DependencyGraph;
use crate::state::DeployedState;

/// A single named output value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutputRecord {
    /// Node that produced the value.
    pub node: String,
    /// Export name.
    pub name: String,
    /// Exported value.
    pub value: String,
}

/// Collects exported identifiers from deployed state.
#[derive(Debug, Default)]
pub struct OutputReporter;

impl OutputReporter {
    /// Creates a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Collects outputs for every deployed node, in declaration order.
    ///
    /// The primary export of a kind falls back to the provider-assigned id
    /// when the provider did not return it as a named attribute. Other
    /// missing exports are omitted. Nodes not yet deployed are skipped.
    #[must_use]
    pub fn collect(&self, graph: &DependencyGraph, state: &DeployedState) -> Vec<OutputRecord> {
        let mut records = Vec::new();

        for node in graph.nodes() {
            let Some(entry) = state.get(&node.name) else {
                debug!("Node '{}' has no deployed state; skipping outputs", node.name);
                continue;
            };

            for (i, export) in node.kind.exports().iter().enumerate() {
                let value = match entry.attributes.get(*export) {
                    Some(v) => v.clone(),
                    None if i == 0 => entry.provider_id.clone(),
                    None => continue,
                };
                records.push(OutputRecord {
                    node: node.name.clone(),
                    name: (*export).to_string(),
                    value,
                });
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ResourceKind, ResourceNode};
    use crate::state::ResourceState;

    fn deployed(name: &str, kind: ResourceKind, id: &str) -> ResourceState {
        ResourceState::new(name, kind, id, "hash")
    }

    #[test]
    fn test_outputs_in_declaration_order() {
        let nodes = vec![
            ResourceNode::new(String::from("zone"), ResourceKind::Zone)
                .with_param("domain_name", "example.com"),
            ResourceNode::new(String::from("certificate"), ResourceKind::Certificate)
                .with_param("domain_name", "example.com")
                .with_param("region", "us-east-1")
                .with_ref("hosted_zone", "zone"),
        ];
        let graph = DependencyGraph::resolve(nodes).expect("graph");

        let mut state = DeployedState::new("site", "dev");
        state.set(deployed("certificate", ResourceKind::Certificate, "arn:abc"));
        state.set(deployed("zone", ResourceKind::Zone, "Z123"));

        let records = OutputReporter::new().collect(&graph, &state);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].node, "zone");
        assert_eq!(records[0].name, "zone_id");
        assert_eq!(records[0].value, "Z123");
        assert_eq!(records[1].name, "certificate_arn");
        assert_eq!(records[1].value, "arn:abc");
    }

    #[test]
    fn test_named_attribute_preferred_over_id() {
        let nodes = vec![
            ResourceNode::new(String::from("distribution"), ResourceKind::Distribution)
                .with_param("default_root_object", "index.html"),
        ];
        let graph = DependencyGraph::resolve(nodes).expect("graph");

        let mut state = DeployedState::new("site", "dev");
        let mut entry = deployed("distribution", ResourceKind::Distribution, "E123");
        entry
            .attributes
            .insert(String::from("distribution_domain"), String::from("d1.cdn.example"));
        state.set(entry);

        let records = OutputReporter::new().collect(&graph, &state);
        // Primary export falls back to the id; the secondary comes from
        // attributes and is present.
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "distribution_id");
        assert_eq!(records[0].value, "E123");
        assert_eq!(records[1].name, "distribution_domain");
        assert_eq!(records[1].value, "d1.cdn.example");
    }

    #[test]
    fn test_undeployed_and_exportless_nodes_skipped() {
        let nodes = vec![
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
            ResourceNode::new(String::from("assets"), ResourceKind::AssetDeployment)
                .with_param("source_path", "./html")
                .with_ref("bucket", "site-bucket"),
        ];
        let graph = DependencyGraph::resolve(nodes).expect("graph");

        let mut state = DeployedState::new("site", "dev");
        state.set(deployed("assets", ResourceKind::AssetDeployment, "dep-1"));

        let records = OutputReporter::new().collect(&graph, &state);
        // The bucket is not deployed and asset deployments export nothing.
        assert!(records.is_empty());
    }
}
