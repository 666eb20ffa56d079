//! Provider capability trait and boundary types.
//!
//! A provider adapter implements four operations: create, update, delete,
//! and lookup. The engine core never issues any other external call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::graph::ResourceKind;

/// Parameters with every reference replaced by the target's deployed
/// identifier.
///
/// Built by the executor immediately before a provider call, so a later
/// action can consume identifiers produced by earlier ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ResolvedParams {
    /// Parameter name to resolved value.
    pub values: BTreeMap<String, serde_json::Value>,
}

/// A provider-assigned identity for a provisioned resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionedResource {
    /// Primary identifier (id, ARN).
    pub id: String,
    /// Additional named attributes (e.g., a distribution's domain name).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// The capability set the executor requires from a provider.
///
/// Implementations perform exactly one API operation per call and do not
/// retry internally; the executor owns retry and backoff policy.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Creates a resource of the given kind, returning its identity.
    async fn create_resource(
        &self,
        kind: ResourceKind,
        params: &ResolvedParams,
    ) -> Result<ProvisionedResource>;

    /// Updates an existing resource in place.
    async fn update_resource(
        &self,
        provider_id: &str,
        kind: ResourceKind,
        params: &ResolvedParams,
    ) -> Result<()>;

    /// Deletes an existing resource.
    async fn delete_resource(&self, provider_id: &str, kind: ResourceKind) -> Result<()>;

    /// Looks up a pre-existing resource by query (e.g., a hosted zone by
    /// domain name), returning its identity.
    async fn lookup(&self, kind: ResourceKind, query: &str) -> Result<ProvisionedResource>;
}

impl ResolvedParams {
    /// Sets a resolved value.
    pub fn insert(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.values.insert(name.into(), value);
    }

    /// Gets a resolved string value.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(serde_json::Value::as_str)
    }
}

impl ProvisionedResource {
    /// Creates an identity with just a primary id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a named attribute, returning the identity for chaining.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}
