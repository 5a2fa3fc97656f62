//! CLI subcommand handlers.

use anyhow::Context;
use simscore_core::config::{SimscoreConfig, config_exists, load_config, workspace_config_path};
use simscore_core::{
    MetricRegistry, RunRecorder, ScoringEngine, SqliteRunStore, WeightSet, compare_runs,
    load_records, summarize_by_tag, summarize_run,
};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::output;
use crate::{Commands, ConfigAction, EvaluateArgs, RunsAction};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Evaluate(args) => handle_evaluate(args, workspace),
        Commands::Runs { action } => handle_runs(action, workspace),
        Commands::Metrics => handle_metrics(),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn builtin_registry() -> MetricRegistry {
    let mut registry = MetricRegistry::new();
    simscore_metrics::register_builtin_metrics(&mut registry);
    registry
}

fn load_workspace_config(workspace: &Path) -> anyhow::Result<SimscoreConfig> {
    load_config(Some(workspace), None).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

/// Apply command-line flags on top of the layered configuration.
fn apply_overrides(config: &mut SimscoreConfig, args: &EvaluateArgs) -> anyhow::Result<()> {
    if !args.weights.is_empty() {
        config.weights = WeightSet::parse_pairs(&args.weights)?;
    }
    if let Some(iterations) = args.iterations {
        config.bootstrap.iterations = iterations;
    }
    if let Some(alpha) = args.alpha {
        config.bootstrap.alpha = alpha;
    }
    if args.seed.is_some() {
        config.bootstrap.seed = args.seed;
    }
    if args.sequential {
        config.scoring.parallel = false;
    }
    if let Some(metric) = &args.metric {
        config.scoring.summary_metric = metric.clone();
    }
    if let Some(top) = args.top {
        config.scoring.top = top;
    }
    if args.database.is_some() {
        config.store.database = args.database.clone();
    }
    config.validate()?;
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs, workspace: &Path) -> anyhow::Result<()> {
    let mut config = load_workspace_config(workspace)?;
    apply_overrides(&mut config, &args)?;

    let records = load_records(&args.data)?;
    let registry = builtin_registry();
    let rows = ScoringEngine::new(&registry)
        .parallel(config.scoring.parallel)
        .evaluate(&records, &config.weights)?;

    println!("Top results (weights: {})", config.weights);
    print!("{}", output::rows_table(&rows, config.scoring.top));

    match summarize_by_tag(&rows, &config.scoring.summary_metric, &config.bootstrap)? {
        Some(summaries) => {
            println!(
                "\nPer-tag summary of '{}' (mean with {:.0}% bootstrap CI):",
                config.scoring.summary_metric,
                (1.0 - config.bootstrap.alpha) * 100.0
            );
            print!("{}", output::tag_summary_table(&summaries));
        }
        None => info!("No tags in dataset; per-tag summary skipped"),
    }

    if let Some(out) = &args.out {
        output::write_csv_file(&rows, out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("\nSaved {} rows to {}", rows.len(), out.display());
    }

    if let Some(database) = &config.store.database {
        let mut store = SqliteRunStore::open(database)?;
        let run_config = serde_json::json!({
            "data": args.data.display().to_string(),
            "weights": &config.weights,
            "bootstrap": &config.bootstrap,
            "summary_metric": &config.scoring.summary_metric,
        });
        let run = store.create_run(&run_config, args.notes.as_deref())?;
        let written = store.log_rows(&run.run_id, &rows)?;
        info!(run_id = %run.run_id, values = written, "Run recorded");
        println!("\nLogged run {} to {}", run.run_id, database.display());
    }

    Ok(())
}

fn resolve_database(database: Option<PathBuf>, workspace: &Path) -> anyhow::Result<PathBuf> {
    if let Some(path) = database {
        return Ok(path);
    }
    load_workspace_config(workspace)?
        .store
        .database
        .ok_or_else(|| anyhow::anyhow!("No database given. Pass --database or set store.database"))
}

fn handle_runs(action: RunsAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        RunsAction::List { database } => {
            let store = SqliteRunStore::open(&resolve_database(database, workspace)?)?;
            let runs = store.list_runs()?;
            if runs.is_empty() {
                println!("No runs recorded.");
            } else {
                print!("{}", output::runs_table(&runs));
            }
            Ok(())
        }
        RunsAction::Show { run_id, database } => {
            let store = SqliteRunStore::open(&resolve_database(database, workspace)?)?;
            let run = store
                .get_run(&run_id)?
                .ok_or_else(|| anyhow::anyhow!("Run '{}' not found", run_id))?;
            println!("run_id:       {}", run.run_id);
            println!("created_at:   {}", run.created_at.to_rfc3339());
            println!(
                "git_revision: {}",
                run.git_revision.as_deref().unwrap_or("-")
            );
            println!("notes:        {}", run.notes.as_deref().unwrap_or(""));
            println!("config:       {}", run.config_json);
            println!();
            print!("{}", output::run_summary_table(&summarize_run(&store, &run_id)?));
            Ok(())
        }
        RunsAction::Compare {
            baseline,
            candidate,
            database,
        } => {
            let store = SqliteRunStore::open(&resolve_database(database, workspace)?)?;
            let comparison = compare_runs(&store, &baseline, &candidate)?;
            println!("Comparing {} (baseline) -> {}", baseline, candidate);
            print!("{}", output::comparison_table(&comparison));
            Ok(())
        }
    }
}

fn handle_metrics() -> anyhow::Result<()> {
    let registry = builtin_registry();
    println!("Registered metrics ({}):", registry.len());
    for name in registry.names() {
        println!("  {}", name);
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&SimscoreConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            if let Some(note) = missing_config_note(workspace) {
                eprintln!("{note}");
            }
            let config = load_workspace_config(workspace)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

/// Hint printed by `config show` when only built-in defaults apply.
fn missing_config_note(workspace: &Path) -> Option<String> {
    if config_exists(Some(workspace)) {
        return None;
    }
    Some(format!(
        "No configuration file found; showing defaults. Run `simscore config init` to create {}",
        workspace_config_path(workspace).display()
    ))
}
