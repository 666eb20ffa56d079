//! Typed resource node model.
//!
//! A node describes one provisionable entity: a stable name, a kind from a
//! closed set, a parameter map whose values are either literals or references
//! to other nodes, and a removal policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of resource kinds the engine can provision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A DNS namespace delegation record set.
    Zone,
    /// A TLS credential bound to one or more domain names.
    Certificate,
    /// An object storage container configured for static content hosting.
    Bucket,
    /// A content-delivery network configuration fronting an origin.
    Distribution,
    /// A DNS record pointing a domain name at a distribution endpoint.
    AliasRecord,
    /// A one-time upload of local assets into a bucket.
    AssetDeployment,
}

/// Per-node directive governing whether deletion from configuration also
/// deletes the live resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Keep the live resource; only remove it from tracked state.
    Retain,
    /// Delete the live resource along with its state entry.
    #[default]
    Destroy,
}

/// A parameter value: either a literal or a reference to another node.
///
/// References are written in YAML as `{ ref: <node-name> }`; everything else
/// is taken as a literal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    /// A symbolic reference to another node's deployed identifier.
    Reference {
        /// Name of the target node.
        r#ref: String,
    },
    /// A literal value (string, number, bool, or list).
    Literal(serde_json::Value),
}

/// A typed description of one provisionable entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceNode {
    /// Stable name, unique within the graph.
    pub name: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Removal policy (defaults to destroy).
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
    /// Parameter map. Keys are sorted for deterministic hashing.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

/// Schema entry for a single parameter of a resource kind.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Whether the parameter must be a reference to another node.
    pub is_ref: bool,
}

impl ParamSpec {
    const fn literal(name: &'static str) -> Self {
        Self { name, is_ref: false }
    }

    const fn reference(name: &'static str) -> Self {
        Self { name, is_ref: true }
    }
}

// Per-kind parameter schemas, as named consts so the slices live in static
// memory and can be handed out by `required_params`/`optional_params`.
const ZONE_REQUIRED: &[ParamSpec] = &[ParamSpec::literal("domain_name")];
const CERTIFICATE_REQUIRED: &[ParamSpec] = &[
    ParamSpec::literal("domain_name"),
    ParamSpec::reference("hosted_zone"),
    ParamSpec::literal("region"),
];
const BUCKET_REQUIRED: &[ParamSpec] = &[ParamSpec::literal("bucket_name")];
const DISTRIBUTION_REQUIRED: &[ParamSpec] = &[
    ParamSpec::reference("origin"),
    ParamSpec::reference("certificate"),
];
const ALIAS_RECORD_REQUIRED: &[ParamSpec] = &[
    ParamSpec::reference("zone"),
    ParamSpec::literal("record_name"),
    ParamSpec::reference("target"),
];
const ASSET_DEPLOYMENT_REQUIRED: &[ParamSpec] = &[
    ParamSpec::literal("source_path"),
    ParamSpec::reference("bucket"),
];

const ZONE_OPTIONAL: &[ParamSpec] = &[ParamSpec::literal("existing")];
const CERTIFICATE_OPTIONAL: &[ParamSpec] = &[ParamSpec::literal("alternative_names")];
const BUCKET_OPTIONAL: &[ParamSpec] = &[
    ParamSpec::literal("public_read_access"),
    ParamSpec::literal("website_index_document"),
    ParamSpec::literal("website_error_document"),
    ParamSpec::literal("auto_delete_objects"),
];
const DISTRIBUTION_OPTIONAL: &[ParamSpec] = &[
    ParamSpec::literal("domain_names"),
    ParamSpec::literal("default_root_object"),
];
const NO_PARAMS: &[ParamSpec] = &[];

impl ResourceKind {
    /// Returns the canonical lowercase identifier for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Zone => "zone",
            Self::Certificate => "certificate",
            Self::Bucket => "bucket",
            Self::Distribution => "distribution",
            Self::AliasRecord => "alias_record",
            Self::AssetDeployment => "asset_deployment",
        }
    }

    /// Returns the parameters that must be present for this kind.
    #[must_use]
    pub const fn required_params(&self) -> &'static [ParamSpec] {
        match self {
            Self::Zone => ZONE_REQUIRED,
            Self::Certificate => CERTIFICATE_REQUIRED,
            Self::Bucket => BUCKET_REQUIRED,
            Self::Distribution => DISTRIBUTION_REQUIRED,
            Self::AliasRecord => ALIAS_RECORD_REQUIRED,
            Self::AssetDeployment => ASSET_DEPLOYMENT_REQUIRED,
        }
    }

    /// Returns the optional parameters this kind understands.
    #[must_use]
    pub const fn optional_params(&self) -> &'static [ParamSpec] {
        match self {
            Self::Zone => ZONE_OPTIONAL,
            Self::Certificate => CERTIFICATE_OPTIONAL,
            Self::Bucket => BUCKET_OPTIONAL,
            Self::Distribution => DISTRIBUTION_OPTIONAL,
            Self::AliasRecord | Self::AssetDeployment => NO_PARAMS,
        }
    }

    /// Returns the names of the identifiers this kind exports after a deploy.
    ///
    /// The first entry is the primary identifier and falls back to the
    /// provider-assigned id when the provider did not return it as a named
    /// attribute.
    #[must_use]
    pub const fn exports(&self) -> &'static [&'static str] {
        match self {
            Self::Zone => &["zone_id"],
            Self::Certificate => &["certificate_arn"],
            Self::Bucket => &["bucket_name"],
            Self::Distribution => &["distribution_id", "distribution_domain"],
            Self::AliasRecord => &["record_name"],
            Self::AssetDeployment => &[],
        }
    }
}

impl ResourceNode {
    /// Creates a new node with the given name and kind.
    #[must_use]
    pub const fn new(name: String, kind: ResourceKind) -> Self {
        Self {
            name,
            kind,
            removal_policy: RemovalPolicy::Destroy,
            params: BTreeMap::new(),
        }
    }

    /// Sets a literal parameter, returning the node for chaining.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params
            .insert(name.to_string(), ParamValue::Literal(value.into()));
        self
    }

    /// Sets a reference parameter, returning the node for chaining.
    #[must_use]
    pub fn with_ref(mut self, name: &str, target: &str) -> Self {
        self.params.insert(
            name.to_string(),
            ParamValue::Reference {
                r#ref: target.to_string(),
            },
        );
        self
    }

    /// Sets the removal policy, returning the node for chaining.
    #[must_use]
    pub const fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    /// Iterates over the node's reference parameters as `(param, target)`.
    pub fn references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().filter_map(|(name, value)| match value {
            ParamValue::Reference { r#ref } => Some((name.as_str(), r#ref.as_str())),
            ParamValue::Literal(_) => None,
        })
    }

    /// Gets a literal parameter value by name.
    #[must_use]
    pub fn literal(&self, name: &str) -> Option<&serde_json::Value> {
        match self.params.get(name) {
            Some(ParamValue::Literal(value)) => Some(value),
            _ => None,
        }
    }

    /// Gets a literal string parameter by name.
    #[must_use]
    pub fn literal_str(&self, name: &str) -> Option<&str> {
        self.literal(name).and_then(serde_json::Value::as_str)
    }

    /// Gets a literal bool parameter by name, defaulting to false.
    #[must_use]
    pub fn literal_bool(&self, name: &str) -> bool {
        self.literal(name)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Returns the node's parameters as a plain JSON snapshot.
    ///
    /// References serialize as `{"ref": <name>}` so the snapshot stored in
    /// state round-trips the declared shape.
    #[must_use]
    pub fn param_snapshot(&self) -> BTreeMap<String, serde_json::Value> {
        self.params
            .iter()
            .map(|(name, value)| {
                let json = match value {
                    ParamValue::Reference { r#ref } => {
                        serde_json::json!({ "ref": r#ref })
                    }
                    ParamValue::Literal(v) => v.clone(),
                };
                (name.clone(), json)
            })
            .collect()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retain => write!(f, "retain"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parsing() {
        let yaml = r"
name: certificate
type: certificate
params:
  domain_name: example.com
  region: us-east-1
  hosted_zone:
    ref: zone
";
        let node: ResourceNode = serde_yaml::from_str(yaml).expect("node should parse");
        assert_eq!(node.kind, ResourceKind::Certificate);
        assert_eq!(node.literal_str("domain_name"), Some("example.com"));

        let refs: Vec<_> = node.references().collect();
        assert_eq!(refs, vec![("hosted_zone", "zone")]);
    }

    #[test]
    fn test_removal_policy_default() {
        let yaml = "
name: site-bucket
type: bucket
params:
  bucket_name: www.example.com
";
        let node: ResourceNode = serde_yaml::from_str(yaml).expect("node should parse");
        assert_eq!(node.removal_policy, RemovalPolicy::Destroy);
    }

    #[test]
    fn test_param_snapshot_round_trips_refs() {
        let node = ResourceNode::new(String::from("dist"), ResourceKind::Distribution)
            .with_ref("origin", "site-bucket")
            .with_param("default_root_object", "index.html");

        let snapshot = node.param_snapshot();
        assert_eq!(
            snapshot.get("origin"),
            Some(&serde_json::json!({ "ref": "site-bucket" }))
        );
        assert_eq!(
            snapshot.get("default_root_object"),
            Some(&serde_json::json!("index.html"))
        );
    }

    #[test]
    fn test_param_schemas_per_kind() {
        let required: Vec<&str> = ResourceKind::Certificate
            .required_params()
            .iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(required, ["domain_name", "hosted_zone", "region"]);
        assert!(ResourceKind::Certificate.required_params()[1].is_ref);

        let optional: Vec<&str> = ResourceKind::Bucket
            .optional_params()
            .iter()
            .map(|p| p.name)
            .collect();
        assert!(optional.contains(&"public_read_access"));
        assert!(ResourceKind::AliasRecord.optional_params().is_empty());
    }

    #[test]
    fn test_exports_per_kind() {
        assert_eq!(ResourceKind::Certificate.exports(), &["certificate_arn"]);
        assert!(ResourceKind::AssetDeployment.exports().is_empty());
    }
}
