//! Error types for the Sitestack provisioning engine.
//!
//! This module provides a comprehensive error hierarchy for all operations
//! in the provisioning lifecycle: configuration, graph resolution, state
//! management, provider API calls, and plan execution.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Sitestack provisioning engine.
#[derive(Debug, Error)]
pub enum SitestackError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Graph resolution errors.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Provider API errors.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Plan execution errors.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate resource name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },
}

/// Graph resolution errors.
///
/// These are structural errors: when any of them occurs, plan generation
/// aborts and no provider call is ever made.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A reference names a node absent from the node set.
    #[error("Unresolved reference: node '{node}' parameter '{param}' refers to unknown node '{target}'")]
    UnresolvedReference {
        /// Node containing the reference.
        node: String,
        /// Parameter holding the reference.
        param: String,
        /// The missing target node.
        target: String,
    },

    /// Resolution would create a reference cycle.
    #[error("Cyclic dependency detected: {cycle}")]
    CyclicDependency {
        /// Description of the cycle.
        cycle: String,
    },

    /// Two nodes share the same name.
    #[error("Duplicate node name in graph: {name}")]
    DuplicateNode {
        /// The duplicated name.
        name: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Backend storage error.
    #[error("State backend error: {message}")]
    Backend {
        /// Description of the backend error.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Provider API errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authentication failed.
    #[error("Provider authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Provider API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("Provider API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Resource not found.
    #[error("Resource not found: {resource_id}")]
    NotFound {
        /// Provider-assigned identifier of the missing resource.
        resource_id: String,
    },

    /// Lookup returned no match.
    ///
    /// Treated as transient: newly delegated DNS zones may not be visible
    /// to the provider immediately.
    #[error("Lookup miss for {kind}: no resource matched '{query}'")]
    LookupMiss {
        /// Resource kind that was queried.
        kind: String,
        /// The lookup query.
        query: String,
    },

    /// Network error.
    #[error("Network error communicating with provider: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from provider API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// A provider call exceeded its timeout.
    #[error("Provider call timed out: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },
}

/// Plan execution errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A specific action failed after retries were exhausted.
    #[error("Failed to {action} resource '{node}': {reason}")]
    ActionFailed {
        /// The action that failed (create, update, delete).
        action: String,
        /// Name of the node.
        node: String,
        /// Reason for failure.
        reason: String,
    },

    /// Maximum retry attempts exceeded.
    #[error("Maximum retry attempts ({attempts}) exceeded while trying to {action} '{node}'")]
    MaxRetriesExceeded {
        /// Number of attempts made.
        attempts: u32,
        /// The action being retried.
        action: String,
        /// Node that failed.
        node: String,
    },

    /// A reference could not be resolved against deployed state.
    ///
    /// Plan ordering guarantees dependencies are applied first, so hitting
    /// this indicates state was modified out of band.
    #[error("Node '{node}' references '{dependency}' which has no deployed identifier")]
    DependencyNotDeployed {
        /// Node whose parameters needed the identifier.
        node: String,
        /// The dependency missing from state.
        dependency: String,
    },

    /// Execution was aborted.
    #[error("Execution aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Result type alias for Sitestack operations.
pub type Result<T> = std::result::Result<T, SitestackError>;

impl SitestackError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider(
                ProviderError::RateLimited { .. }
                    | ProviderError::NetworkError { .. }
                    | ProviderError::Timeout { .. }
                    | ProviderError::LookupMiss { .. }
            ) | Self::State(StateError::LockFailed { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Provider(ProviderError::RateLimited { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            Self::Provider(
                ProviderError::NetworkError { .. } | ProviderError::Timeout { .. },
            ) => Some(5),
            Self::Provider(ProviderError::LookupMiss { .. }) => Some(10),
            Self::State(StateError::LockFailed { .. }) => Some(2),
            _ => None,
        }
    }

    /// Returns true if this is a structural error that blocks provider calls.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Graph(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StateError {
    /// Creates a backend error with the given message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ProviderError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}
