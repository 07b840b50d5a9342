// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod ui;
pub mod workspace;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{CONFIG_ENV_VAR, RunConfig, load_from_path};
use crate::engine::{Pipeline, PipelineOptions, Plan, RunReport};
use crate::errors::{Result, RunError};
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::workspace::Workspace;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - workspace location
/// - the stage pipeline with the real process executor
///
/// `args.config` must be set; `main` prints usage and exits before calling
/// this when it isn't.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .ok_or_else(|| RunError::Config("no config path given".to_string()))?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let config = load_from_path(fs.as_ref(), &config_path)?;

    let base_dir = match args.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let workspace = Workspace::new(&base_dir);

    if args.dry_run {
        let plan = Plan::build(&config, &workspace)?;
        print_dry_run(&config, &plan);
        return Ok(());
    }

    let report = run_pipeline(
        config,
        workspace,
        fs,
        RealExecutorBackend::new(),
        PipelineOptions::default(),
    )
    .await?;

    info!(
        messages = report.messages.len(),
        workspace = ?report.workspace,
        "run finished"
    );
    Ok(())
}

/// Build and run a pipeline with an arbitrary executor backend.
pub async fn run_pipeline<E: exec::ExecutorBackend>(
    config: RunConfig,
    workspace: Workspace,
    fs: Arc<dyn FileSystem>,
    executor: E,
    options: PipelineOptions,
) -> Result<RunReport> {
    Pipeline::new(config, workspace, fs, executor, options)
        .run()
        .await
}

/// Simple dry-run output: print what each stage would do.
fn print_dry_run(config: &RunConfig, plan: &Plan) {
    println!("tisf-run dry-run");
    println!("  config: {}", config.source().display());
    println!("  workspace: {}", plan.workspace.path().display());
    println!(
        "  env: {} ({} bytes of JSON)",
        CONFIG_ENV_VAR,
        plan.config_json.len()
    );
    println!();

    println!("stages:");
    for cmd in [&plan.fetch, &plan.install, &plan.entry] {
        println!("  - {}", cmd.stage);
        println!("      cmd: {}", cmd.display_line());
        println!("      cwd: {}", cmd.cwd.display());
    }

    debug!("dry-run complete (no execution)");
}
