//! Configuration handling for the Sitestack engine.
//!
//! This module provides parsing, validation, and hashing of stack
//! configuration files.

mod hash;
mod parser;
mod spec;
mod validator;

pub use hash::ParamHasher;
pub use parser::{find_config_file, ConfigParser};
pub use spec::{ProjectConfig, StackConfig, StateConfig};
pub use validator::{ConfigValidator, ValidationIssue, ValidationResult};
