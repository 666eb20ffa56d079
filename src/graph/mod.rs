//! Resource graph model for the Sitestack engine.
//!
//! This module defines the typed resource node model and the reference
//! resolver that turns a flat node list into an acyclic dependency graph.

mod node;
mod resolver;

pub use node::{ParamSpec, ParamValue, RemovalPolicy, ResourceKind, ResourceNode};
pub use resolver::DependencyGraph;
