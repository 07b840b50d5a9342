// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The pipeline talks to an `ExecutorBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation in [`command`](super::command) and
//! [`entry`](super::entry).
//!
//! - `RealExecutorBackend` is the implementation used by `tisf-run`.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which commands were issued and scripts the child's messages and exit.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::types::{RunnerEvent, StageCommand, StageOutput};

use super::command::run_stage_command;
use super::entry::spawn_entry;

/// Trait abstracting how stage commands and the entry script are executed.
pub trait ExecutorBackend: Send {
    /// Run a stage command to completion and return its captured output.
    ///
    /// A non-zero exit is reported through `StageOutput::code`, not as an
    /// error; errors mean the command could not be run at all.
    fn run_stage(
        &mut self,
        command: StageCommand,
    ) -> Pin<Box<dyn Future<Output = Result<StageOutput>> + Send + '_>>;

    /// Start the entry script.
    ///
    /// The implementation must send every child message and then exactly one
    /// `RunnerEvent::Exited` on `events`.
    fn spawn_entry(
        &mut self,
        command: StageCommand,
        events: mpsc::Sender<RunnerEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
#[derive(Debug, Clone, Default)]
pub struct RealExecutorBackend;

impl RealExecutorBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn run_stage(
        &mut self,
        command: StageCommand,
    ) -> Pin<Box<dyn Future<Output = Result<StageOutput>> + Send + '_>> {
        Box::pin(async move { run_stage_command(&command).await })
    }

    fn spawn_entry(
        &mut self,
        command: StageCommand,
        events: mpsc::Sender<RunnerEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { spawn_entry(&command, events) })
    }
}
