// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the external tools of a
//! run (`git`, `npm`, `node`) using `tokio::process::Command`.
//!
//! - [`command`] runs a stage command to completion with captured output.
//! - [`entry`] launches the entry script and turns its messages and exit into
//!   `RunnerEvent`s.
//! - [`ipc`] sets up the parent/child message channel.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` the pipeline uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod entry;
pub mod ipc;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use command::{ensure_success, run_stage_command};
pub use entry::spawn_entry;
