use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dbdrift::{assign_object_id_tags, build_graph, sort, format_value_diff};
use dbdrift::{DefinitionLoader, DefinitionValidator, DriftResolver, PlanOptions, PlanTableRow, Planner};
use dbdrift::{ResourceId, SnapshotStateSource, StateQuery};
use dbdrift::error::{DbDriftError, StateFetchError};
use tabled::{Table, settings::Style};

#[derive(Parser)]
#[command(name = "dbdrift")]
#[command(about = "Declarative database resources: detect drift and plan reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the definitions directory
    #[arg(short, long, env = "DBDRIFT_DEFINITIONS", default_value = "./definitions")]
    definitions: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate all definitions
    Validate,

    /// List all declared resources
    List {
        /// Show dependencies and tags
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print resources in dependency order
    Order,

    /// Compare definitions with a state snapshot and print the reconciliation plan
    Plan {
        /// State snapshot file (YAML or JSON)
        #[arg(short, long, env = "DBDRIFT_STATE")]
        state: PathBuf,

        /// Plan drops for live resources that no definition declares
        #[arg(long)]
        prune: bool,

        /// Show a line diff for every changed resource
        #[arg(long)]
        diff: bool,

        /// Only emit these resources (type::name); repeatable
        #[arg(short, long = "resource")]
        resources: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,

        /// Exit with status 2 when the plan has pending changes
        #[arg(long)]
        exit_code: bool,
    },

    /// Resolve a single resource against a state snapshot
    Check {
        /// Resource id (type::name)
        resource: String,

        /// State snapshot file (YAML or JSON)
        #[arg(short, long, env = "DBDRIFT_STATE")]
        state: PathBuf,
    },

    /// Generate missing object_id_tag values
    Tag {
        /// Write generated tags back to the definition files
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Yaml,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("dbdrift=debug")
    } else {
        EnvFilter::new("dbdrift=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.no_color || !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            print_error(e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: Box<dyn std::error::Error>) {
    if let Some(DbDriftError::StateFetch { resource, source }) = err.downcast_ref::<DbDriftError>() {
        print_state_error(resource, source);
        return;
    }

    if let Some(state_err) = err.downcast_ref::<StateFetchError>() {
        print_state_error("snapshot", state_err);
        return;
    }

    eprintln!("{} {}", "✗ Error:".red(), err);
}

fn print_state_error(resource: &str, err: &StateFetchError) {
    eprintln!("\n{}", format!("✗ State Error [{}] {}", err.error_code(), resource).red());
    eprintln!("  {}", err);
    eprintln!("\n{}", "Suggestion:".yellow());
    for line in err.suggestion().lines() {
        eprintln!("  {}", line);
    }
    eprintln!();
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let loader = DefinitionLoader::new();

    match cli.command {
        Commands::Validate => {
            cmd_validate(&loader, &cli.definitions)?;
        }

        Commands::List { detailed } => {
            cmd_list(&loader, &cli.definitions, detailed)?;
        }

        Commands::Order => {
            cmd_order(&loader, &cli.definitions)?;
        }

        Commands::Plan { state, prune, diff, resources, output, exit_code } => {
            let pending = cmd_plan(&loader, &cli.definitions, &state, prune, diff, resources, output)?;
            if exit_code && pending {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::Check { resource, state } => {
            cmd_check(&loader, &cli.definitions, &resource, &state)?;
        }

        Commands::Tag { write } => {
            cmd_tag(&loader, &cli.definitions, write)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(loader: &DefinitionLoader, definitions_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating definitions in {}", definitions_path.display());

    let definitions = loader.load_dir(definitions_path)?;
    let result = DefinitionValidator::validate(&definitions);

    for definition in definitions.definitions() {
        let id = definition.node_id();
        let errors: Vec<_> = result.errors.iter().filter(|e| e.resource == id).collect();
        let warnings: Vec<_> = result.warnings.iter().filter(|w| w.resource == id).collect();

        let status = if !errors.is_empty() {
            "✗".red()
        } else if !warnings.is_empty() {
            "⚠".yellow()
        } else {
            "✓".green()
        };
        println!("{} {}", status, id);

        for err in errors {
            println!("    {} [{}] {}", "✗".red(), err.code, err.message);
        }
        for warn in warnings {
            println!("    {} [{}] {}", "⚠".yellow(), warn.code, warn.message);
        }
    }

    println!();

    if !result.is_valid() {
        println!("✗ Validation failed: {} errors, {} warnings in {} definitions",
            result.errors.len(), result.warnings.len(), result.definitions);
        return Err("Validation failed".into());
    } else if result.has_warnings() {
        println!("⚠ {} definitions validated with {} warnings", result.definitions, result.warnings.len());
    } else {
        println!("✓ {} definitions validated successfully", result.definitions);
    }

    Ok(())
}

fn cmd_list(loader: &DefinitionLoader, definitions_path: &Path, detailed: bool) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = loader.load_dir(definitions_path)?;

    if definitions.is_empty() {
        println!("No definitions found in {}", definitions_path.display());
        return Ok(());
    }

    for definition in definitions.definitions() {
        if detailed {
            println!("{}", definition.node_id());
            println!("  file: {}", definition.file_name());

            let dependencies = definition.dependency_ids();
            if !dependencies.is_empty() {
                println!("  depends on: {}", dependencies.join(", "));
            }

            if let Some(tag) = definition.object_id_tag() {
                println!("  object_id_tag: {}", tag);
            }

            println!();
        } else {
            println!("{:<20} {:<30} {}",
                definition.resource_type(),
                definition.name(),
                definition.file_name()
            );
        }
    }

    Ok(())
}

fn cmd_order(loader: &DefinitionLoader, definitions_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = loader.load_dir(definitions_path)?;
    let graph = build_graph(&definitions)?;

    for (position, node) in sort(&graph)?.iter().enumerate() {
        println!("{:>3}. {}", position + 1, node);
    }

    Ok(())
}

fn cmd_plan(
    loader: &DefinitionLoader,
    definitions_path: &Path,
    state_path: &Path,
    prune: bool,
    show_diff: bool,
    resources: Vec<String>,
    output: OutputFormat,
) -> Result<bool, Box<dyn std::error::Error>> {
    let definitions = loader.load_dir(definitions_path)?;
    let source = SnapshotStateSource::load(state_path)?;

    for resource in &resources {
        if definitions.get(resource).is_none() && !prune {
            warn!("Resource filter '{}' matches no definition", resource);
        }
    }

    let options = PlanOptions { prune, resources, ..Default::default() };
    let plan = Planner::new(&definitions, &source).with_options(options).plan()?;

    match output {
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&plan)?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Table => {
            println!("\nReconciliation Plan\n");

            let rows: Vec<PlanTableRow> = plan.table_rows();
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);

            let summary = plan.summary();
            println!("\nSummary:");
            println!("  {} {} to create", "+".green(), summary.create);
            println!("  {} {} to alter", "~".yellow(), summary.alter);
            println!("  {} {} to drop", "-".red(), summary.drop);
            println!("  = {} unchanged", summary.no_action);

            if show_diff && plan.has_changes() {
                println!("\nChanges:\n");
                for step in plan.changes() {
                    println!("{}  {}", step.id, step.iac_action);
                    println!("{}", format_value_diff(step.observed.as_ref(), &step.declared));
                    println!();
                }
            }
        }
    }

    Ok(plan.has_changes())
}

fn cmd_check(
    loader: &DefinitionLoader,
    definitions_path: &Path,
    resource: &str,
    state_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let id: ResourceId = resource.parse()?;
    let definitions = loader.load_dir(definitions_path)?;
    let definition = definitions
        .get(&id.node_id())
        .ok_or_else(|| format!("Resource not found: {}", id))?;

    let source = SnapshotStateSource::load(state_path)?;
    let resolver = DriftResolver::new(&source);
    let query = StateQuery::for_definition(definition);
    let inspection = resolver.inspect(&definition.body, &query, definition.name())?;

    println!("{}", serde_json::to_string_pretty(&inspection.resolution)?);

    if inspection.resolution.iac_action.is_change() {
        println!("{}", format_value_diff(inspection.observed.as_ref(), &inspection.declared));
    }

    Ok(())
}

fn cmd_tag(loader: &DefinitionLoader, definitions_path: &Path, write: bool) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = loader.load_dir(definitions_path)?;
    let assignment = assign_object_id_tags(&definitions)?;

    if assignment.is_unchanged() {
        println!("✓ Every definition already has an object_id_tag");
        return Ok(());
    }

    for edit in &assignment.edits {
        println!("{} {}::{} -> {} ({})",
            "+".green(), edit.resource_type, edit.name, edit.tag, edit.file.display());
    }

    if write {
        let written = loader.apply_tag_edits(&assignment.edits)?;
        println!("\n✓ Updated {} files", written.len());
    } else {
        println!("\nRun with --write to update the definition files");
    }

    Ok(())
}
