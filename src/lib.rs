// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Sitestack
//!
//! A declarative, idempotent provisioning engine for static-site cloud stacks.
//!
//! ## Overview
//!
//! Sitestack provides a Terraform-like plan/apply experience for the handful
//! of resources a static website needs, allowing you to:
//!
//! - Define your stack as code in a YAML configuration file
//! - Resolve references between resources into a dependency graph
//! - Diff the declared graph against persisted deployment state
//! - Apply an ordered plan of provider API calls with retry and backoff
//! - Surface exported identifiers (ids, ARNs, domain names) after a deploy
//!
//! ## Architecture
//!
//! The system is built around a small **declarative resource graph**:
//!
//! 1. **Resource nodes**: typed descriptions of one provisionable entity
//! 2. **Reference resolver**: turns symbolic references into an acyclic graph
//! 3. **Plan builder**: topologically orders create/update/delete actions
//! 4. **Executor**: issues provider calls sequentially, recording new state
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`graph`]: Resource node model and reference resolution
//! - [`planner`]: Diff computation, plan construction, and execution
//! - [`provider`]: Provider API boundary and HTTP adapter
//! - [`state`]: Deployment state types and storage backends
//! - [`outputs`]: Exported output collection
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: stormit-site
//!   environment: prod
//!
//! resources:
//!   - name: zone
//!     type: zone
//!     params:
//!       domain_name: stormit.link
//!       existing: true
//!   - name: site-bucket
//!     type: bucket
//!     params:
//!       bucket_name: www.stormit.link
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod outputs;
pub mod planner;
pub mod provider;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ParamHasher, StackConfig};
pub use error::{Result, SitestackError};
pub use graph::{DependencyGraph, ParamValue, RemovalPolicy, ResourceKind, ResourceNode};
pub use outputs::{OutputRecord, OutputReporter};
pub use planner::{ActionKind, DiffEngine, Plan, PlanAction, PlanExecutor};
pub use provider::{HttpProvider, Provider, ProvisionedResource, ResolvedParams};
pub use state::{DeployedState, LocalStateStore, ResourceState, StateStore};
