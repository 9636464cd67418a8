//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use pledgeprep_core::config::WORKSPACE_CONFIG_FILE;
use pledgeprep_core::{Pipeline, PrepConfig, PrepOverrides, load_config};
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
    overrides: &PrepOverrides,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, config_file, overrides),
        Commands::Run => handle_run(load(workspace, config_file, overrides)?).await,
        Commands::Fetch => handle_fetch(load(workspace, config_file, overrides)?).await,
        Commands::Inspect { json } => {
            handle_inspect(load(workspace, config_file, overrides)?, json).await
        }
    }
}

fn load(
    workspace: &Path,
    config_file: Option<&Path>,
    overrides: &PrepOverrides,
) -> anyhow::Result<PrepConfig> {
    load_config(workspace, config_file, Some(overrides)).context("Failed to load config")
}

async fn handle_run(config: PrepConfig) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config);
    let outcome = pipeline
        .run()
        .await
        .context("Preparation run failed")?;

    let report = &outcome.report;
    println!(
        "train: {:>6} rows\nval:   {:>6} rows\ntest:  {:>6} rows",
        report.train.rows, report.val.rows, report.test.rows
    );
    if report.skipped_rows > 0 {
        println!("skipped: {} rows with an unrecognised split tag", report.skipped_rows);
    }
    for path in &outcome.files {
        println!("wrote {}", path.display());
    }
    Ok(())
}

async fn handle_fetch(config: PrepConfig) -> anyhow::Result<()> {
    let path = config.dataset_path.clone();
    let acquisition = Pipeline::new(config)
        .fetch()
        .await
        .with_context(|| format!("Failed to acquire dataset at {}", path.display()))?;

    let state = if acquisition.downloaded {
        "downloaded"
    } else {
        "cached"
    };
    println!(
        "{} ({state}, {} rows, sha256 {})",
        path.display(),
        acquisition.batch.row_count(),
        acquisition.sha256
    );
    Ok(())
}

async fn handle_inspect(config: PrepConfig, json: bool) -> anyhow::Result<()> {
    let summary = Pipeline::new(config)
        .inspect()
        .await
        .context("Failed to inspect dataset")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} rows, columns: {}", summary.rows, summary.columns.join(", "));
    for (tag, stats) in &summary.by_tag {
        println!("  {tag}: {} rows", stats.rows);
        for (label, count) in &stats.labels {
            println!("    {label:<12} {count:>6}  ({:.1}%)", stats.share(label) * 100.0);
        }
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
    overrides: &PrepOverrides,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join(WORKSPACE_CONFIG_FILE);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            std::fs::create_dir_all(workspace)?;
            let toml_str = toml::to_string_pretty(&PrepConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file, overrides)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
