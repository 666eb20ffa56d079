//! Parameter hashing for change detection.
//!
//! This module provides deterministic hashing of resource node parameters
//! to detect changes between runs and enable idempotent planning.

use sha2::{Digest, Sha256};

use crate::graph::{ParamValue, ResourceNode};

/// Hasher for computing resource parameter hashes.
#[derive(Debug, Default)]
pub struct ParamHasher;

impl ParamHasher {
    /// Creates a new parameter hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash for a single resource node's declared parameters.
    ///
    /// The hash covers the node kind and every parameter in sorted key
    /// order; references hash by target name. It deliberately excludes the
    /// removal policy, which is deployment metadata rather than a material
    /// parameter.
    #[must_use]
    pub fn hash_node(&self, node: &ResourceNode) -> String {
        let mut hasher = Sha256::new();

        hasher.update(node.kind.as_str().as_bytes());

        // BTreeMap iteration is already sorted by key.
        for (name, value) in &node.params {
            hasher.update(name.as_bytes());
            match value {
                ParamValue::Reference { r#ref } => {
                    hasher.update(b"ref:");
                    hasher.update(r#ref.as_bytes());
                }
                ParamValue::Literal(v) => {
                    hasher.update(b"lit:");
                    hasher.update(v.to_string().as_bytes());
                }
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RemovalPolicy, ResourceKind};

    fn bucket(name: &str, bucket_name: &str) -> ResourceNode {
        ResourceNode::new(name.to_string(), ResourceKind::Bucket)
            .with_param("bucket_name", bucket_name)
    }

    #[test]
    fn test_hash_deterministic() {
        let hasher = ParamHasher::new();
        let node = bucket("site", "www.example.com");

        assert_eq!(hasher.hash_node(&node), hasher.hash_node(&node));
    }

    #[test]
    fn test_param_change_changes_hash() {
        let hasher = ParamHasher::new();
        let a = bucket("site", "www.example.com");
        let b = bucket("site", "cdn.example.com");

        assert_ne!(hasher.hash_node(&a), hasher.hash_node(&b));
    }

    #[test]
    fn test_reference_target_affects_hash() {
        let hasher = ParamHasher::new();
        let a = ResourceNode::new(String::from("dist"), ResourceKind::Distribution)
            .with_ref("origin", "bucket-a")
            .with_ref("certificate", "cert");
        let b = ResourceNode::new(String::from("dist"), ResourceKind::Distribution)
            .with_ref("origin", "bucket-b")
            .with_ref("certificate", "cert");

        assert_ne!(hasher.hash_node(&a), hasher.hash_node(&b));
    }

    #[test]
    fn test_removal_policy_does_not_affect_hash() {
        let hasher = ParamHasher::new();
        let a = bucket("site", "www.example.com");
        let b = bucket("site", "www.example.com").with_removal_policy(RemovalPolicy::Retain);

        assert_eq!(hasher.hash_node(&a), hasher.hash_node(&b));
    }

    #[test]
    fn test_short_hash() {
        let short = ParamHasher::short_hash("abcdef1234567890");
        assert_eq!(short, "abcdef12");
    }
}
