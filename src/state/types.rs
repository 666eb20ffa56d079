//! State types for tracking deployed resources.
//!
//! These types record the last-applied parameter snapshot and the
//! provider-assigned identifiers for every node, enabling diff-based
//! planning and resumable runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::{RemovalPolicy, ResourceKind};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// The complete deployed state of a stack.
///
/// Owned by the caller and passed explicitly into planning and execution;
/// never a hidden singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedState {
    /// State format version.
    pub version: String,
    /// Project name.
    pub project: String,
    /// Environment name.
    pub environment: String,
    /// State of individual resources, keyed by node name.
    pub resources: BTreeMap<String, ResourceState>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Run history (recent entries).
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// State of a single deployed resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Node name (from configuration).
    pub name: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Primary provider-assigned identifier (id, ARN).
    pub provider_id: String,
    /// Additional provider-assigned attributes (e.g., distribution domain).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Hash of the parameters when last applied.
    pub param_hash: String,
    /// Last-applied parameter snapshot.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    /// Removal policy recorded at apply time.
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
    /// Names of the nodes this resource referenced when applied.
    ///
    /// Used to order deletes after the node leaves the configuration.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
    /// When the resource was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A single entry in the run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the run occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of operation.
    pub operation: StackOperation,
    /// Resources affected.
    pub resources: Vec<String>,
    /// Whether the run succeeded.
    pub success: bool,
    /// Optional error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Types of stack operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StackOperation {
    /// Plan application.
    Apply,
    /// Full teardown.
    Destroy,
}

impl DeployedState {
    /// Creates a new empty deployed state.
    #[must_use]
    pub fn new(project: &str, environment: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            project: project.to_string(),
            environment: environment.to_string(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Gets a resource by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceState> {
        self.resources.get(name)
    }

    /// Gets a mutable reference to a resource by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ResourceState> {
        self.resources.get_mut(name)
    }

    /// Adds or updates a resource.
    pub fn set(&mut self, resource: ResourceState) {
        self.resources.insert(resource.name.clone(), resource);
        self.last_updated = Utc::now();
    }

    /// Removes a resource by name.
    pub fn remove(&mut self, name: &str) -> Option<ResourceState> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.last_updated = Utc::now();
        }
        result
    }

    /// Returns all tracked resource names.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Returns true if no resources are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Adds a history entry, keeping only the most recent entries.
    pub fn add_history(&mut self, entry: HistoryEntry) {
        const MAX_HISTORY: usize = 100;
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }
}

impl ResourceState {
    /// Creates a new resource state entry.
    #[must_use]
    pub fn new(name: &str, kind: ResourceKind, provider_id: &str, param_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            kind,
            provider_id: provider_id.to_string(),
            attributes: BTreeMap::new(),
            param_hash: param_hash.to_string(),
            params: BTreeMap::new(),
            removal_policy: RemovalPolicy::default(),
            depends_on: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the entry as updated now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl HistoryEntry {
    /// Creates a new successful history entry.
    #[must_use]
    pub fn new(operation: StackOperation, resources: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            resources,
            success: true,
            error: None,
        }
    }

    /// Creates a failed history entry.
    #[must_use]
    pub fn failed(operation: StackOperation, resources: Vec<String>, error: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            resources,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl std::fmt::Display for StackOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}
