//! Configuration specification types for the provisioning engine.
//!
//! This module defines the structs that map to the `sitestack.yaml` file.
//! These types are declarative and fully describe the desired stack.

use serde::{Deserialize, Serialize};

use crate::graph::ResourceNode;

/// The root configuration structure for a Sitestack deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// State backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Declared resource nodes, in declaration order.
    pub resources: Vec<ResourceNode>,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Unique name for the project.
    pub name: String,
    /// Environment (e.g., "dev", "staging", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Default provider region.
    #[serde(default)]
    pub region: Option<String>,
}

/// State backend configuration.
///
/// State is stored as a JSON file; the path defaults to `.sitestack/` next
/// to the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Custom state directory path.
    #[serde(default)]
    pub path: Option<String>,
}

fn default_environment() -> String {
    String::from("dev")
}

impl StackConfig {
    /// Returns the declared node names in declaration order.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    /// Gets a declared resource by name.
    #[must_use]
    pub fn get_resource(&self, name: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.name == name)
    }
}
