//! Planning and execution for the Sitestack engine.
//!
//! This module computes diffs between the declared graph and deployed state,
//! builds deterministically ordered plans, and executes them against a
//! provider.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffDetail, DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use executor::{ActionOutcome, ExecutionResult, PlanExecutor, RetryPolicy};
pub use plan::{ActionKind, Plan, PlanAction};
