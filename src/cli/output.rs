//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::outputs::OutputRecord;
use crate::planner::{ActionKind, ExecutionResult, Plan};
use crate::state::DeployedState;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Resource")]
    node: String,
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a provisioning plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &Plan) -> String {
        if !plan.has_changes() {
            return format!(
                "{} No changes required - stack is up to date.\n",
                "✓".green()
            );
        }

        let mut output = String::from("\nProvisioning Plan\n\n");

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .filter(|a| a.kind != ActionKind::Noop)
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_kind(a.kind),
                kind: a.resource_kind.to_string(),
                resource: a.node.clone(),
                reason: Self::truncate(&a.reason, 40),
            })
            .collect();

        if !rows.is_empty() {
            let table = Table::new(rows).to_string();
            output.push_str(&table);
            output.push('\n');
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to delete, {} unchanged\n",
            plan.count(ActionKind::Create).to_string().green(),
            plan.count(ActionKind::Update).to_string().yellow(),
            plan.count(ActionKind::Delete).to_string().red(),
            plan.count(ActionKind::Noop)
        );

        output
    }

    /// Formats an execution result for display.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ExecutionJson::from(result)).unwrap_or_default()
            }
            OutputFormat::Text => {
                let status = if result.success() {
                    format!("{} Apply complete", "✓".green())
                } else {
                    format!("{} Apply failed", "✗".red())
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Created: {}", result.created);
                let _ = writeln!(output, "   Updated: {}", result.updated);
                let _ = writeln!(output, "   Deleted: {}", result.deleted);
                let _ = writeln!(output, "   Unchanged: {}", result.unchanged);
                let _ = writeln!(output, "   Provider calls: {}", result.provider_calls);

                let failures: Vec<_> = result.outcomes.iter().filter(|o| !o.success).collect();
                if !failures.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
                    for outcome in failures {
                        let _ = writeln!(
                            output,
                            "   - {}: {}",
                            outcome.node,
                            outcome.message.as_deref().unwrap_or("unknown error")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats exported outputs for display.
    #[must_use]
    pub fn format_outputs(&self, records: &[OutputRecord]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(records).unwrap_or_default(),
            OutputFormat::Text => {
                if records.is_empty() {
                    return String::from("No outputs available. Run 'sitestack apply' first.\n");
                }

                let rows: Vec<OutputRow> = records
                    .iter()
                    .map(|r| OutputRow {
                        node: r.node.clone(),
                        name: r.name.clone(),
                        value: r.value.clone(),
                    })
                    .collect();

                let mut output = String::from("\nStack Outputs\n\n");
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats deployed state.
    #[must_use]
    pub fn format_state(&self, state: &DeployedState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(
                    output,
                    "\nState: {}/{}\n\n",
                    state.project, state.environment
                );

                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                let _ = writeln!(output, "   Resources: {}", state.resources.len());

                for (name, entry) in &state.resources {
                    let _ = writeln!(
                        output,
                        "     - {name} ({}) -> {}",
                        entry.kind, entry.provider_id
                    );
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let status = if entry.success { "✓" } else { "✗" };
                        let _ = writeln!(
                            output,
                            "     {status} {} - {} ({})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.operation,
                            entry.resources.join(", ")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats an action kind with color.
    fn format_action_kind(kind: ActionKind) -> String {
        match kind {
            ActionKind::Create => "+create".green().to_string(),
            ActionKind::Update => "~update".yellow().to_string(),
            ActionKind::Delete => "-delete".red().to_string(),
            ActionKind::Noop => "noop".dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    ///
    /// Counts characters rather than bytes: reasons embed user-supplied
    /// parameter names, which may be multibyte.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson {
    action_count: usize,
    creates: usize,
    updates: usize,
    deletes: usize,
    unchanged: usize,
    actions: Vec<ActionJson>,
}

#[derive(serde::Serialize)]
struct ActionJson {
    action: String,
    kind: String,
    resource: String,
    reason: String,
}

impl From<&Plan> for PlanJson {
    fn from(plan: &Plan) -> Self {
        Self {
            action_count: plan.actions.len(),
            creates: plan.count(ActionKind::Create),
            updates: plan.count(ActionKind::Update),
            deletes: plan.count(ActionKind::Delete),
            unchanged: plan.count(ActionKind::Noop),
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action: a.kind.to_string(),
                    kind: a.resource_kind.to_string(),
                    resource: a.node.clone(),
                    reason: a.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(serde::Serialize)]
struct ExecutionJson {
    success: bool,
    created: usize,
    updated: usize,
    deleted: usize,
    unchanged: usize,
    provider_calls: usize,
    changed_resources: Vec<String>,
}

impl From<&ExecutionResult> for ExecutionJson {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            success: result.success(),
            created: result.created,
            updated: result.updated,
            deleted: result.deleted,
            unchanged: result.unchanged,
            provider_calls: result.provider_calls,
            changed_resources: result.changed_resources(),
        }
    }
}
