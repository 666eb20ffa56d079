//! Sitestack CLI entrypoint.
//!
//! This is the main entrypoint for the sitestack command-line tool.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use sitestack::cli::{Cli, Commands, OutputFormatter, StateCommands};
use sitestack::config::{find_config_file, ConfigParser, ConfigValidator, StackConfig};
use sitestack::error::Result;
use sitestack::graph::DependencyGraph;
use sitestack::planner::{Plan, PlanExecutor, RetryPolicy};
use sitestack::provider::HttpProvider;
use sitestack::state::{DeployedState, LocalStateStore, StackOperation, StateStore};
use sitestack::OutputReporter;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            // Structural errors (bad config, unresolved references, cycles)
            // exit with a distinct code so scripts can tell them apart from
            // provisioning failures.
            if e.is_structural() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings),
        Commands::Plan { detailed } => cmd_plan(cli.config.as_ref(), detailed, &formatter).await,
        Commands::Apply { yes, max_attempts } => {
            cmd_apply(cli.config.as_ref(), yes, max_attempts, &formatter).await
        }
        Commands::Destroy { yes } => cmd_destroy(cli.config.as_ref(), yes, &formatter).await,
        Commands::Outputs => cmd_outputs(cli.config.as_ref(), &formatter).await,
        Commands::State { command } => cmd_state(cli.config.as_ref(), command, &formatter).await,
    }
}

/// Initialize a new project.
fn cmd_init(path: &PathBuf, force: bool) -> Result<()> {
    info!("Initializing new Sitestack project in: {}", path.display());

    let config_path = path.join("sitestack.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    // Write config template
    let config_template = include_str!("../templates/sitestack.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    // Write .env.example
    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    let gitignore_content = ".env\n.sitestack/\n";
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.contains(".env") || !existing.contains(".sitestack") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# Sitestack")?;
            if !existing.contains(".env") {
                writeln!(file, ".env")?;
            }
            if !existing.contains(".sitestack") {
                writeln!(file, ".sitestack/")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, gitignore_content)?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your API credentials");
    eprintln!("  2. Edit sitestack.yaml with your stack definition");
    eprintln!("  3. Run 'sitestack validate' to check your configuration");
    eprintln!("  4. Run 'sitestack plan' to see what will be provisioned");
    eprintln!("  5. Run 'sitestack apply' to provision your stack");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| std::path::Path::new(".")),
    );
    parser.load_dotenv()?;

    let config = parser.load_file(&config_file)?;

    let validator = ConfigValidator::new();
    let result = validator.validate(&config)?;

    // Resolution catches what per-node validation cannot: dangling
    // references and cycles.
    let graph = DependencyGraph::resolve(config.resources.clone())?;

    eprintln!("Configuration is valid!");
    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  - {warning}");
        }
    }

    eprintln!("\nConfiguration summary:");
    eprintln!("  Project: {}", config.project.name);
    eprintln!("  Environment: {}", config.project.environment);
    eprintln!("  Resources: {}", graph.len());

    Ok(())
}

/// Show provisioning plan.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let graph = DependencyGraph::resolve(config.resources.clone())?;

    let state = state_store
        .load()
        .await?
        .unwrap_or_else(|| DeployedState::new(&config.project.name, &config.project.environment));

    let plan = Plan::build(&graph, &state);
    eprintln!("{}", formatter.format_plan(&plan));

    if detailed {
        eprintln!("\nDetailed changes:");
        for action in &plan.actions {
            eprintln!("  {action}");
        }
    }

    Ok(())
}

/// Apply the provisioning plan.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    max_attempts: u32,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let graph = DependencyGraph::resolve(config.resources.clone())?;

    let mut state = state_store
        .load()
        .await?
        .unwrap_or_else(|| DeployedState::new(&config.project.name, &config.project.environment));

    let plan = Plan::build(&graph, &state);

    if !plan.has_changes() {
        eprintln!("No changes to apply.");
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan));

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let provider = create_provider()?;
    let retry = RetryPolicy {
        max_attempts,
        ..RetryPolicy::default()
    };

    let lock = state_store.acquire_lock("").await?;
    let result = PlanExecutor::new(&provider, &state_store)
        .with_retry_policy(retry)
        .execute(&plan, &graph, &mut state, StackOperation::Apply)
        .await;
    release_lock_quietly(state_store.as_ref(), &lock.lock_id).await;
    let result = result?;

    eprintln!("\n{}", formatter.format_execution(&result));

    let outputs = OutputReporter::new().collect(&graph, &state);
    if !outputs.is_empty() {
        eprintln!("{}", formatter.format_outputs(&outputs));
    }

    Ok(())
}

/// Destroy all deployed resources.
async fn cmd_destroy(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, state_store) = load_config_and_state(config_path)?;

    let Some(mut state) = state_store.load().await? else {
        eprintln!("No state found - nothing to destroy.");
        return Ok(());
    };

    if state.is_empty() {
        eprintln!("No resources to destroy.");
        return Ok(());
    }

    // A destroy is an apply of the empty graph: every tracked resource is
    // planned as a delete in reverse dependency order.
    let empty_graph = DependencyGraph::resolve(vec![])?;
    let plan = Plan::build(&empty_graph, &state);

    eprintln!("The following resources will be destroyed:");
    for action in &plan.actions {
        eprintln!("  - {} ({})", action.node, action.resource_kind);
    }

    if !auto_approve
        && !confirm(
            "\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ",
            "destroy",
        )?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let provider = create_provider()?;
    let lock = state_store.acquire_lock("").await?;
    let result = PlanExecutor::new(&provider, &state_store)
        .execute(&plan, &empty_graph, &mut state, StackOperation::Destroy)
        .await;
    release_lock_quietly(state_store.as_ref(), &lock.lock_id).await;
    let result = result?;

    eprintln!("\n{}", formatter.format_execution(&result));

    if state.is_empty() {
        state_store.delete().await?;
        eprintln!("All resources destroyed.");
    }

    Ok(())
}

/// Show exported outputs.
async fn cmd_outputs(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let graph = DependencyGraph::resolve(config.resources.clone())?;

    let Some(state) = state_store.load().await? else {
        eprintln!("No state found. Run 'sitestack apply' first.");
        return Ok(());
    };

    let records = OutputReporter::new().collect(&graph, &state);
    eprintln!("{}", formatter.format_outputs(&records));

    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, state_store) = load_config_and_state(config_path)?;

    match command {
        StateCommands::Show => {
            if let Some(state) = state_store.load().await? {
                eprintln!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found.");
            }
        }
        StateCommands::Lock { holder } => {
            let holder_str = holder.as_deref().unwrap_or("");
            let lock = state_store.acquire_lock(holder_str).await?;
            eprintln!("State locked: {}", lock.lock_id);
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                if let Some(lock_info) = state_store.get_lock_info().await? {
                    state_store.release_lock(&lock_info.lock_id).await?;
                    eprintln!("State forcefully unlocked.");
                }
            } else if let Some(id) = lock_id {
                state_store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Releases the state lock, logging a failure instead of returning it.
///
/// A release error must never mask the execution result the caller is
/// about to propagate; an expired lock clears itself anyway.
async fn release_lock_quietly(store: &dyn StateStore, lock_id: &str) {
    if let Err(e) = store.release_lock(lock_id).await {
        warn!("Failed to release state lock {lock_id}: {e}");
    }
}

/// Prompts on stderr and reads a confirmation from stdin.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case(expected))
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads configuration and creates the state store.
fn load_config_and_state(
    config_path: Option<&PathBuf>,
) -> Result<(StackConfig, Box<dyn StateStore>)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| std::path::Path::new(".")),
    );
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;

    // Validate
    let validator = ConfigValidator::new();
    validator.validate(&config)?;

    // State lives next to the configuration file unless overridden.
    let state_dir = config.state.path.as_ref().map_or_else(
        || {
            config_file
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."))
                .join(".sitestack")
        },
        PathBuf::from,
    );
    let state_store: Box<dyn StateStore> = Box::new(LocalStateStore::with_base_dir(state_dir));

    Ok((config, state_store))
}

/// Creates the provider API adapter from the environment.
fn create_provider() -> Result<HttpProvider> {
    let api_url = ConfigParser::get_api_url()?;
    let api_key = ConfigParser::get_api_key()?;
    HttpProvider::new(&api_url, &api_key)
}
