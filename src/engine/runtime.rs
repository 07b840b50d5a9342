// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::errors::{Result, RunError};
use crate::exec::{ExecutorBackend, ensure_success};
use crate::fs::FileSystem;
use crate::types::{ChildExit, ChildMessage, RunnerEvent, Stage, StageCommand};
use crate::ui::StageSpinner;
use crate::workspace::Workspace;

use super::stages;
use super::{COMPLETION_MESSAGE, PipelineOptions, RunReport};

/// Drives one run from workspace preparation to cleanup, delegating process
/// execution to an `ExecutorBackend`.
///
/// The serialized config only lives for the duration of [`Pipeline::run`]
/// and only reaches the outside world through the environment of the
/// commands it spawns.
pub struct Pipeline<E: ExecutorBackend> {
    config: RunConfig,
    workspace: Workspace,
    fs: Arc<dyn FileSystem>,
    executor: E,
    options: PipelineOptions,
}

impl<E: ExecutorBackend> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config.source())
            .field("workspace", &self.workspace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Pipeline<E> {
    pub fn new(
        config: RunConfig,
        workspace: Workspace,
        fs: Arc<dyn FileSystem>,
        executor: E,
        options: PipelineOptions,
    ) -> Self {
        Self {
            config,
            workspace,
            fs,
            executor,
            options,
        }
    }

    /// Run every stage in order.
    ///
    /// On any error the workspace is left in place for inspection.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(
            config = ?self.config.source(),
            workspace = ?self.workspace.path(),
            "pipeline started"
        );

        let config_json = self.config.to_json()?;

        self.staged(Stage::Prepare, |pipeline| {
            pipeline.workspace.prepare(pipeline.fs.as_ref())
        })?;

        let fetch = stages::fetch_command(&self.config, &self.workspace, &config_json)?;
        self.run_checked(fetch).await?;

        let install = stages::install_command(&self.workspace, &config_json);
        self.run_checked(install).await?;

        let (messages, exit) = self.run_entry(&config_json).await?;
        if !exit.success() {
            warn!(%exit, workspace = ?self.workspace.path(), "entry script failed; keeping workspace");
            return Err(RunError::ChildFailed(exit));
        }

        drop(config_json);
        self.cleanup()?;

        Ok(RunReport {
            workspace: self.workspace.path().to_path_buf(),
            messages,
            exit,
        })
    }

    /// Run a stage command and fail on a non-zero exit.
    async fn run_checked(&mut self, command: StageCommand) -> Result<()> {
        let spinner = StageSpinner::start(command.stage, self.options.show_progress);

        let result = match self.executor.run_stage(command.clone()).await {
            Ok(output) => ensure_success(&command, output).map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                spinner.succeed();
                Ok(())
            }
            Err(e) => {
                spinner.fail();
                Err(e)
            }
        }
    }

    /// Start the entry script, relay its messages, and wait for its exit.
    async fn run_entry(&mut self, config_json: &str) -> Result<(Vec<ChildMessage>, ChildExit)> {
        let entry = stages::entry_script_path(&self.workspace);
        if !self.fs.is_file(&entry) {
            return Err(RunError::EntryScriptMissing(entry));
        }
        info!(entry = ?entry, "entry script located");

        let spinner = StageSpinner::start(Stage::Run, self.options.show_progress);
        let (events_tx, mut events_rx) = mpsc::channel::<RunnerEvent>(64);

        let command = stages::entry_command(&self.workspace, config_json);
        if let Err(e) = self.executor.spawn_entry(command, events_tx).await {
            spinner.fail();
            return Err(e);
        }

        let mut messages = Vec::new();
        let exit = loop {
            match events_rx.recv().await {
                Some(RunnerEvent::Message(message)) => {
                    spinner.print_line(message.relay_text());
                    messages.push(message);
                }
                Some(RunnerEvent::Output(line)) => spinner.print_line(&line),
                Some(RunnerEvent::Exited(exit)) => break exit,
                None => {
                    spinner.fail();
                    return Err(RunError::Other(anyhow!(
                        "entry script events stopped before its exit was observed"
                    )));
                }
            }
        };

        debug!(messages = messages.len(), %exit, "entry script finished");

        if exit.success() {
            spinner.succeed();
        } else {
            spinner.fail();
        }
        Ok((messages, exit))
    }

    fn cleanup(&self) -> Result<()> {
        self.staged(Stage::Cleanup, |pipeline| {
            pipeline.workspace.remove(pipeline.fs.as_ref())
        })?;
        println!("{COMPLETION_MESSAGE}");
        Ok(())
    }

    /// Run an in-process stage step under its spinner.
    fn staged(&self, stage: Stage, step: impl FnOnce(&Self) -> Result<()>) -> Result<()> {
        let spinner = StageSpinner::start(stage, self.options.show_progress);
        match step(self) {
            Ok(()) => {
                spinner.succeed();
                Ok(())
            }
            Err(e) => {
                spinner.fail();
                Err(e)
            }
        }
    }
}
