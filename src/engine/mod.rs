// src/engine/mod.rs

//! Orchestration engine for tisf-run.
//!
//! A run is a strictly forward sequence of stages:
//! prepare workspace → fetch → install → run entry script → cleanup.
//! Each stage is awaited before the next begins.
//!
//! The pure command builders live in [`stages`]; the async pipeline that
//! drives an `ExecutorBackend` is implemented in [`runtime`].

use std::path::PathBuf;

use crate::types::{ChildExit, ChildMessage};

/// Pipeline options.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Draw stage spinners on stderr.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            show_progress: true,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Where the workspace was (it no longer exists).
    pub workspace: PathBuf,
    /// Every relayed message, in arrival order.
    pub messages: Vec<ChildMessage>,
    pub exit: ChildExit,
}

/// Printed after a successful cleanup.
pub const COMPLETION_MESSAGE: &str = "The execution is done!";

pub mod runtime;
pub mod stages;

pub use runtime::Pipeline;
pub use stages::Plan;
