//! Stagehand CLI entrypoint.
//!
//! This is the main entrypoint for the stagehand command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stagehand::cli::{Cli, Commands, LogFormat, OutputFormat, OutputFormatter};
use stagehand::config::{
    find_config_file, ConfigParser, ConfigValidator, StagehandConfig,
};
use stagehand::error::{ConfigError, Result, StagehandError};
use stagehand::generator::{
    ChatCompletionsGenerator, FileGenerator, InfraPlan, PlanGenerator, TemplateRenderer,
};
use stagehand::history::{HistoryStore, LocalHistoryStore};
use stagehand::provisioning::{ExecutionStatus, Provisioner, ProvisioningExecutor};
use stagehand::workflow::WorkflowOrchestrator;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

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
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Chat => cmd_chat(cli.config.as_ref(), &formatter).await,
        Commands::Apply { file, yes } => {
            cmd_apply(cli.config.as_ref(), &file, yes, &formatter).await
        }
        Commands::Validate { warnings } => {
            cmd_validate(cli.config.as_ref(), warnings, &formatter)
        }
        Commands::Render { plan } => cmd_render(&plan, cli.output).await,
        Commands::History { limit } => cmd_history(cli.config.as_ref(), limit, &formatter).await,
    }
}

/// Initialize a new project.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new Stagehand project in: {}", path.display());

    let config_path = path.join("stagehand.yaml");
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
    let config_template = include_str!("../templates/stagehand.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    // Write .env.example
    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    let ignored = [".env", ".stagehand/", ".terraform/", "*.tfstate*", "tfplan"];
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = ignored
            .iter()
            .copied()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# Stagehand")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ignored.join("\n") + "\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your keys");
    eprintln!("  2. Review stagehand.yaml");
    eprintln!("  3. Run 'stagehand chat' and describe the infrastructure you need");

    Ok(())
}

/// Interactive propose/confirm session.
async fn cmd_chat(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let config = load_config(config_path)?;
    let generator = create_generator(&config)?;
    let mut workflow = build_workflow(&config, generator);

    eprintln!("Describe the infrastructure you need.");
    eprintln!("After a plan is shown, type 'yes' to apply it or 'no' to discard it. 'exit' quits.\n");

    loop {
        eprint!("stagehand> ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let line = input.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => {}
            "exit" | "quit" => break,
            "yes" | "y" | "approve" => {
                let result = workflow.confirm(true).await;
                println!("{}", formatter.format_execution(&result));
            }
            "no" | "n" | "cancel" => {
                let result = workflow.confirm(false).await;
                println!("{}", formatter.format_execution(&result));
            }
            _ => {
                let result = workflow.propose(line).await;
                println!("{}", formatter.format_proposal(&result));
                if result.is_generated() {
                    eprintln!("Apply this plan? Type 'yes' to apply or 'no' to discard.");
                }
            }
        }
    }

    if workflow.has_pending() {
        warn!("Exiting with an unconfirmed plan; it has been discarded");
    }
    Ok(())
}

/// Propose a Terraform file and apply it after confirmation.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    file: &Path,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut workflow = build_workflow(&config, FileGenerator::new(file));

    let proposal = workflow.propose(&file.display().to_string()).await;
    println!("{}", formatter.format_proposal(&proposal));
    if !proposal.is_generated() {
        return Err(StagehandError::internal(proposal.description));
    }

    // Confirm
    let approved = if auto_approve {
        true
    } else {
        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        let answer = input.trim();
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    };

    let result = workflow.confirm(approved).await;
    println!("{}", formatter.format_execution(&result));

    if result.status == ExecutionStatus::Error {
        return Err(StagehandError::internal("provisioning failed"));
    }
    Ok(())
}

/// Validate the configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let result = ConfigValidator::new().validate(&config)?;

    eprintln!("Configuration is valid!");
    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        eprint!("{}", formatter.format_validation(&result));
    }

    eprintln!("\nConfiguration summary:");
    eprintln!("  Workspace: {}", config.workspace.dir.join(&config.workspace.file_name).display());
    eprintln!("  Terraform: {}", config.terraform.binary);
    eprintln!("  Generator: {} ({:?} mode)", config.generator.model, config.generator.mode);
    eprintln!(
        "  History: {}",
        if config.history.enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}

/// Render a structured plan to Terraform.
async fn cmd_render(plan_path: &Path, format: OutputFormat) -> Result<()> {
    let content = tokio::fs::read_to_string(plan_path).await.map_err(|e| {
        StagehandError::Config(ConfigError::ParseError {
            message: format!("Cannot read plan: {e}"),
            location: Some(plan_path.display().to_string()),
        })
    })?;

    // YAML is a superset of JSON, so both plan formats parse here
    let plan: InfraPlan = serde_yaml::from_str(&content).map_err(|e| {
        StagehandError::Config(ConfigError::ParseError {
            message: e.to_string(),
            location: Some(plan_path.display().to_string()),
        })
    })?;
    plan.validate()?;

    let renderer = TemplateRenderer::new();
    let description = renderer.describe(&plan);
    let code = renderer.render(&plan);

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "description": description, "code": code });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Text => {
            eprintln!("{description}\n");
            print!("{code}");
        }
    }

    Ok(())
}

/// Show recorded confirm outcomes.
async fn cmd_history(
    config_path: Option<&PathBuf>,
    limit: usize,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let store = LocalHistoryStore::from_config(&config.history);
    debug!("Reading history from: {}", store.path().display());

    let entries = store.recent(limit).await?;
    println!("{}", formatter.format_history(&entries));

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads the configuration, falling back to defaults when no file exists.
fn load_config(config_path: Option<&PathBuf>) -> Result<StagehandConfig> {
    let cwd = std::env::current_dir()
        .map_err(|e| StagehandError::internal(format!("Cannot determine current directory: {e}")))?;

    let config_file = match config_path {
        Some(path) => Some(path.clone()),
        None => match find_config_file(&cwd) {
            Ok(path) => Some(path),
            Err(StagehandError::Config(ConfigError::FileNotFound { .. })) => None,
            Err(e) => return Err(e),
        },
    };

    let config = if let Some(config_file) = config_file {
        debug!("Loading configuration from: {}", config_file.display());
        let parser = ConfigParser::new()
            .with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")));
        parser.load_dotenv()?;
        parser.load_with_env(&config_file)?
    } else {
        debug!("No configuration file found, using defaults");
        let parser = ConfigParser::new().with_base_path(&cwd);
        parser.load_dotenv()?;
        parser.defaults_with_env()
    };

    // Validate
    let validation = ConfigValidator::new().validate(&config)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    Ok(config)
}

/// Creates the model-backed plan generator.
fn create_generator(config: &StagehandConfig) -> Result<Box<dyn PlanGenerator>> {
    let api_key = ConfigParser::get_api_key(config)?;
    Ok(Box::new(ChatCompletionsGenerator::new(&config.generator, &api_key)?))
}

/// Wires a generator to the terraform pipeline and history.
fn build_workflow<G: PlanGenerator>(
    config: &StagehandConfig,
    generator: G,
) -> WorkflowOrchestrator<G, impl Provisioner> {
    let executor = ProvisioningExecutor::from_config(config);
    debug!("Workspace: {}", executor.merger().config_file().display());

    let workflow = WorkflowOrchestrator::new(generator, executor);
    if config.history.enabled {
        let history: Box<dyn HistoryStore> = Box::new(LocalHistoryStore::from_config(&config.history));
        workflow.with_history(history)
    } else {
        workflow
    }
}
