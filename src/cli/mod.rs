//! CLI module for the Sitestack provisioning tool.
//!
//! This module provides the command-line interface for managing
//! static-site cloud stacks.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
