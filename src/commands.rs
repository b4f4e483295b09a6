//! Command implementations for sqlcompare CLI

use crate::backend::with_connection;
use crate::cli::{Commands, OutputFormat};
use crate::comparator::{parse_column_list, CompareOptions, CompareOutcome, Comparator};
use crate::data::{table_name_for, DataLoader};
use crate::dataset::Dataset;
use crate::error::{CompareError, Result};
use crate::inspect::{InspectMode, Inspector, SaveMode};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::resolver::{RunLookup, RunResolver};
use crate::run::{clean_run_name, file_run_name, short_id};
use crate::workspace::{CompareWorkspace, Settings};
use std::path::Path;

/// Execute a command
pub fn execute_command(command: Commands, workspace_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Init {
            force,
            schema,
            connection,
        } => init_command(workspace_path, force, schema, connection),
        Commands::Table {
            previous,
            current,
            index,
            connection,
            schema,
            name,
            include,
            ignore,
        } => {
            let mut options = CompareOptions::new(parse_column_list(&index));
            options.run_name = name;
            options.include_columns = include.as_deref().map(parse_column_list);
            options.ignore_columns = ignore.as_deref().map(parse_column_list);
            table_command(workspace_path, &previous, &current, connection.as_deref(), schema.as_deref(), options)
        }
        Commands::Query {
            previous,
            current,
            index,
            connection,
            schema,
            name,
        } => {
            let mut options = CompareOptions::new(parse_column_list(&index));
            options.run_name = name;
            query_command(workspace_path, &previous, &current, connection.as_deref(), schema.as_deref(), options)
        }
        Commands::Dataset {
            path,
            connection,
            schema,
            name,
        } => dataset_command(workspace_path, &path, connection.as_deref(), schema.as_deref(), name),
        Commands::Inspect {
            run,
            column,
            limit,
            stats,
            missing_current,
            missing_previous,
            list_columns,
            save,
            format,
        } => {
            let mode = if stats {
                InspectMode::Stats
            } else if missing_current {
                InspectMode::MissingCurrent
            } else if missing_previous {
                InspectMode::MissingPrevious
            } else if list_columns {
                InspectMode::ListColumns
            } else {
                InspectMode::Diffs
            };
            inspect_command(workspace_path, &run, mode, column.as_deref(), limit, save.as_deref(), &format)
        }
        Commands::List { pattern, format } => list_command(workspace_path, pattern.as_deref(), &format),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(CompareError::invalid_argument)
}

/// Initialize sqlcompare workspace
fn init_command(
    workspace_path: Option<&Path>,
    force: bool,
    schema: Option<String>,
    connection: Option<String>,
) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let root = workspace_path.unwrap_or(&current_dir);

    // Always create in the given directory, never in a parent
    let workspace = CompareWorkspace::create_new(root.to_path_buf())?;

    if force || schema.is_some() || connection.is_some() {
        let existing = workspace.settings()?;
        let settings = Settings {
            default_schema: schema.or(existing.default_schema),
            default_connection: connection.or(existing.default_connection),
            ..Settings::default()
        };
        workspace.write_settings(&settings, true)?;
    }

    println!("✅ Initialized sqlcompare workspace at: {}", workspace.root.display());
    println!("📁 Workspace directory: {}", workspace.workspace_dir.display());
    Ok(())
}

fn print_outcome(outcome: &CompareOutcome) {
    println!(
        "📊 Missing in current: {} | Missing in previous: {} | Differences: {}",
        outcome.summary.missing_in_current, outcome.summary.missing_in_previous, outcome.summary.diff_total
    );
    PrettyPrinter::print_compare_hints(outcome.run_id());
}

/// Compare two tables, or two data files loaded into a scratch database
fn table_command(
    workspace_path: Option<&Path>,
    previous: &str,
    current: &str,
    connection: Option<&str>,
    schema: Option<&str>,
    options: CompareOptions,
) -> Result<()> {
    let workspace = CompareWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let store = workspace.run_store();
    let mut options = options.with_schema(settings.resolve_schema(schema));

    let previous_path = Path::new(previous);
    let current_path = Path::new(current);
    let files = match (previous_path.is_file(), current_path.is_file()) {
        (true, true) => true,
        (false, false) => false,
        _ => {
            return Err(CompareError::invalid_argument(
                "Compare two files or two tables, not one of each",
            ))
        }
    };

    if files && options.run_name.is_none() {
        options.run_name = Some(file_run_name(previous_path, current_path));
    }

    let identifier = match settings.resolve_connection(connection) {
        Some(identifier) => identifier,
        None if files => {
            let name = clean_run_name(options.run_name.as_deref().unwrap_or("compare"));
            let path = workspace.scratch_db_path(&name);
            format!("duckdb:///{}", path.display())
        }
        None => {
            return Err(CompareError::config(
                "No connection given. Use --connection, SQLCOMPARE_CONN_DEFAULT or 'sqlcompare init --connection'",
            ))
        }
    };

    let outcome = with_connection(&identifier, |db| {
        let (previous_table, current_table) = if files {
            for path in [previous_path, current_path] {
                if !DataLoader::is_supported_format(path) {
                    return Err(CompareError::invalid_argument(format!(
                        "Unsupported file format: {}",
                        path.display()
                    )));
                }
            }
            let loader = DataLoader::new(db);
            let tag = short_id();
            let prev = loader.load_file(previous_path, &table_name_for(previous_path, "prev", &tag))?;
            let curr = loader.load_file(current_path, &table_name_for(current_path, "curr", &tag))?;
            (prev.table, curr.table)
        } else {
            (previous.to_string(), current.to_string())
        };

        Comparator::new(db, &store)
            .with_progress(true)
            .compare(&previous_table, &current_table, &options)
    })?;

    print_outcome(&outcome);
    Ok(())
}

/// Compare the results of two SELECT statements
fn query_command(
    workspace_path: Option<&Path>,
    previous: &str,
    current: &str,
    connection: Option<&str>,
    schema: Option<&str>,
    options: CompareOptions,
) -> Result<()> {
    let workspace = CompareWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let store = workspace.run_store();
    let options = options.with_schema(settings.resolve_schema(schema));

    let identifier = settings.resolve_connection(connection).ok_or_else(|| {
        CompareError::config("No connection given. Use --connection or SQLCOMPARE_CONN_DEFAULT")
    })?;

    let outcome = with_connection(&identifier, |db| {
        Comparator::new(db, &store)
            .with_progress(true)
            .compare_queries(previous, current, &options)
    })?;

    print_outcome(&outcome);
    Ok(())
}

/// Compare the two sides of a YAML dataset definition
fn dataset_command(
    workspace_path: Option<&Path>,
    path: &Path,
    connection: Option<&str>,
    schema: Option<&str>,
    name: Option<String>,
) -> Result<()> {
    let dataset = Dataset::load(path)?;
    let index = dataset.validate()?;
    let section_connection = dataset.connection(connection)?;

    let workspace = CompareWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let store = workspace.run_store();
    let tag = short_id();

    let identifier = match section_connection.or_else(|| settings.resolve_connection(None)) {
        Some(identifier) => identifier,
        None if dataset.uses_files_only() => {
            let db_name = format!("dataset_{}_{}", dataset.name, tag);
            format!("duckdb:///{}", workspace.scratch_db_path(&db_name).display())
        }
        None => {
            return Err(CompareError::config(
                "No connection given. Use --connection, a dataset connection or SQLCOMPARE_CONN_DEFAULT",
            ))
        }
    };

    let options = CompareOptions::new(index)
        .with_schema(settings.resolve_schema(schema))
        .with_run_name(name.unwrap_or_else(|| format!("dataset_{}", dataset.name)));

    let outcome = with_connection(&identifier, |db| {
        let (previous_table, new_table) = dataset.materialize(db, &options.schema, &tag)?;
        Comparator::new(db, &store)
            .with_progress(true)
            .compare(&previous_table, &new_table, &options)
    })?;

    print_outcome(&outcome);
    Ok(())
}

/// Inspect a saved run against the live backend
fn inspect_command(
    workspace_path: Option<&Path>,
    run_query: &str,
    mode: InspectMode,
    column: Option<&str>,
    limit: usize,
    save: Option<&str>,
    format: &str,
) -> Result<()> {
    let format = parse_format(format)?;
    let save = save.map(SaveMode::parse).transpose()?;

    let workspace = CompareWorkspace::find_or_create(workspace_path)?;
    let store = workspace.run_store();
    let run = match RunResolver::new(&store).resolve(run_query)? {
        RunLookup::Found(run) => run,
        RunLookup::Ambiguous(ids) => {
            PrettyPrinter::print_ambiguous(run_query, &ids);
            return Ok(());
        }
    };

    with_connection(&run.connection, |db| {
        let inspector = Inspector::new(db, &run)?;
        let current_dir = std::env::current_dir()?;

        match save {
            Some(SaveMode::Rows) => {
                let path = inspector.export_rows(mode, column, &current_dir)?;
                println!("💾 Saved rows to {}", path.display());
                return Ok(());
            }
            Some(SaveMode::Summary) => {
                let path = inspector.export_summary(&current_dir)?;
                println!("💾 Saved summary to {}", path.display());
                return Ok(());
            }
            None => {}
        }

        if mode == InspectMode::ListColumns {
            let counts = inspector.column_counts()?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = counts
                        .into_iter()
                        .map(|(column, count)| (column, serde_json::json!(count)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
                OutputFormat::Pretty => {
                    println!("📋 Compared columns ({}):", counts.len());
                    for (i, (column, count)) in counts.iter().enumerate() {
                        let prefix = if i == counts.len() - 1 { "└─" } else { "├─" };
                        println!("{} {}: {} differences", prefix, column, count);
                    }
                }
            }
            return Ok(());
        }

        let result = inspector.fetch(mode, column, Some(limit))?;
        match format {
            OutputFormat::Json => println!("{}", JsonFormatter::format_result(&result)?),
            OutputFormat::Pretty => {
                PrettyPrinter::print_run(&run);
                println!();
                if result.is_empty() {
                    println!("✨ No rows to show");
                } else {
                    PrettyPrinter::print_table(&result);
                }
            }
        }
        Ok(())
    })
}

/// List saved runs
fn list_command(workspace_path: Option<&Path>, pattern: Option<&str>, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let workspace = CompareWorkspace::find_or_create(workspace_path)?;
    let store = workspace.run_store();
    let runs = RunResolver::new(&store).filter(pattern)?;

    match format {
        OutputFormat::Json => println!("{}", JsonFormatter::format_runs(&runs)?),
        OutputFormat::Pretty => PrettyPrinter::print_run_list(&runs),
    }
    Ok(())
}
