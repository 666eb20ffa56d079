//! Provider API boundary.
//!
//! The executor's only external dependency is the capability set defined by
//! the [`Provider`] trait; [`HttpProvider`] adapts it to a REST provisioning
//! API.

mod api;
mod http;

pub use api::{Provider, ProvisionedResource, ResolvedParams};
pub use http::HttpProvider;
