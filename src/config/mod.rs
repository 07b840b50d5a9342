// src/config/mod.rs

//! Configuration loading for tisf-run.
//!
//! Responsibilities:
//! - Hold the parsed YAML document and read `meta.*` fields on demand (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//!
//! There is no schema validation: a document without `meta.repo` or
//! `meta.branch` loads fine and fails when the fetch stage asks for them.

pub mod loader;
pub mod model;

pub use loader::{load_from_path, parse_document};
pub use model::{CONFIG_ENV_VAR, MetaSection, RunConfig};
