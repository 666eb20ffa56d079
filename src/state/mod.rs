//! State management for tracking deployed resources.
//!
//! This module provides the deployed-state types, the storage backend trait,
//! and the local file-based backend with lock support.

mod local;
mod lock;
mod store;
mod types;

pub use local::LocalStateStore;
pub use lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
pub use store::StateStore;
pub use types::{
    DeployedState, HistoryEntry, ResourceState, StackOperation, STATE_VERSION,
};
